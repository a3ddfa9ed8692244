//! [`ControlPlane`] over the REST API.
//!
//! Every failure is converted to [`declarative::Error::RemoteRequest`] with
//! the HTTP status when there was one. The message carries the error
//! category and its advice.

use crate::Client;
use declarative::{
    ControlPlane, Error as CoreError, FieldMap, Filter, ObjectId, Operation, RemoteResource,
    Result as CoreResult,
};
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn remote(operation: Operation, collection: &str, err: &crate::Error) -> CoreError {
    let category = err.category();
    CoreError::RemoteRequest {
        operation,
        collection: collection.to_string(),
        message: format!("{err} ({category}. {})", category.advice()),
        status: err.status(),
    }
}

/// Query parameters for a name-or-id lookup.
///
/// `or__` filters are OR'ed together by the server and AND'ed with the rest.
#[must_use]
pub fn lookup_query(name_or_id: &str, filter: &Filter) -> Vec<(String, String)> {
    let mut query = vec![("or__name".to_string(), name_or_id.to_string())];
    if name_or_id.parse::<ObjectId>().is_ok() {
        query.push(("or__id".to_string(), name_or_id.to_string()));
    }
    query.extend(filter.iter().map(|(k, v)| (k.clone(), v.clone())));
    query
}

fn parse_resource(
    operation: Operation,
    collection: &str,
    value: Option<Value>,
) -> CoreResult<RemoteResource> {
    let value = value.ok_or_else(|| {
        CoreError::remote(operation, collection, "server returned no object")
    })?;
    serde_json::from_value(value).map_err(|e| {
        CoreError::remote(operation, collection, format!("unexpected object: {e}"))
    })
}

fn parse_ids(collection: &str, items: Vec<Value>) -> CoreResult<BTreeSet<ObjectId>> {
    items
        .iter()
        .map(|item| {
            item.get("id").and_then(Value::as_u64).ok_or_else(|| {
                CoreError::remote(Operation::Lookup, collection, "list item without an id")
            })
        })
        .collect()
}

impl ControlPlane for Client {
    fn lookup(
        &self,
        collection: &str,
        name_or_id: &str,
        filter: &Filter,
    ) -> CoreResult<Vec<RemoteResource>> {
        let items = self
            .list(&format!("{collection}/"), &lookup_query(name_or_id, filter))
            .map_err(|e| remote(Operation::Lookup, collection, &e))?;
        items
            .into_iter()
            .map(|item| parse_resource(Operation::Lookup, collection, Some(item)))
            .collect()
    }

    fn copy(
        &self,
        collection: &str,
        source: &RemoteResource,
        new_name: &str,
    ) -> CoreResult<RemoteResource> {
        let path = source
            .related_link("copy")
            .map_or_else(|| format!("{collection}/{}/copy/", source.id), str::to_string);
        let created = self
            .post(&path, &json!({ "name": new_name }))
            .map_err(|e| remote(Operation::Copy, collection, &e))?;
        parse_resource(Operation::Copy, collection, created)
    }

    fn create(&self, collection: &str, fields: &FieldMap) -> CoreResult<RemoteResource> {
        let created = self
            .post(&format!("{collection}/"), &Value::Object(fields.clone()))
            .map_err(|e| remote(Operation::Create, collection, &e))?;
        parse_resource(Operation::Create, collection, created)
    }

    fn update(
        &self,
        collection: &str,
        id: ObjectId,
        fields: &FieldMap,
    ) -> CoreResult<RemoteResource> {
        let updated = self
            .patch(&format!("{collection}/{id}/"), &Value::Object(fields.clone()))
            .map_err(|e| remote(Operation::Update, collection, &e))?;
        parse_resource(Operation::Update, collection, Some(updated))
    }

    fn delete(&self, collection: &str, id: ObjectId) -> CoreResult<()> {
        let deleted = Client::delete(self, &format!("{collection}/{id}/"))
            .map_err(|e| remote(Operation::Delete, collection, &e))?;
        if !deleted {
            log::debug!("{collection} {id} was already gone");
        }
        Ok(())
    }

    fn associated(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
    ) -> CoreResult<BTreeSet<ObjectId>> {
        let items = self
            .list(&format!("{collection}/{id}/{association}/"), &[])
            .map_err(|e| remote(Operation::Lookup, collection, &e))?;
        parse_ids(collection, items)
    }

    fn associate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> CoreResult<()> {
        self.post(
            &format!("{collection}/{id}/{association}/"),
            &json!({ "id": member }),
        )
        .map_err(|e| remote(Operation::Associate, collection, &e))?;
        Ok(())
    }

    fn disassociate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> CoreResult<()> {
        self.post(
            &format!("{collection}/{id}/{association}/"),
            &json!({ "id": member, "disassociate": true }),
        )
        .map_err(|e| remote(Operation::Associate, collection, &e))?;
        Ok(())
    }
}
