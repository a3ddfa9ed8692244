//! In-memory control plane for testing without network access.
//!
//! [`MockControlPlane`] keeps objects per collection, association links per
//! object, and a log of every call so tests can assert exactly which remote
//! operations a run issued.
//!
//! ```
//! use declarative::{ControlPlane, Filter, MockControlPlane};
//! use serde_json::json;
//!
//! let plane = MockControlPlane::new();
//! let org = plane.insert("organizations", "Bar", json!({}));
//!
//! let found = plane.lookup("organizations", "Bar", &Filter::new()).unwrap();
//! assert_eq!(found[0].id, org);
//! ```

use crate::context::ControlPlane;
use crate::error::{Error, Operation, Result};
use crate::types::{FieldMap, Filter, ObjectId, RemoteResource};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

/// A call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Lookup {
        collection: String,
        name_or_id: String,
        filter: Filter,
    },
    Copy {
        collection: String,
        source: ObjectId,
        new_name: String,
    },
    Create {
        collection: String,
        fields: FieldMap,
    },
    Update {
        collection: String,
        id: ObjectId,
        fields: FieldMap,
    },
    Delete {
        collection: String,
        id: ObjectId,
    },
    Associated {
        collection: String,
        id: ObjectId,
        association: String,
    },
    Associate {
        collection: String,
        id: ObjectId,
        association: String,
        member: ObjectId,
    },
    Disassociate {
        collection: String,
        id: ObjectId,
        association: String,
        member: ObjectId,
    },
}

impl Call {
    /// Whether this call changes remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Lookup { .. } | Self::Associated { .. })
    }
}

type LinkKey = (String, ObjectId, String);

/// Mock control plane backed by in-memory maps
#[derive(Debug, Default)]
pub struct MockControlPlane {
    objects: RefCell<BTreeMap<String, Vec<RemoteResource>>>,
    links: RefCell<BTreeMap<LinkKey, BTreeSet<ObjectId>>>,
    calls: RefCell<Vec<Call>>,
    failing: RefCell<BTreeSet<&'static str>>,
    next_id: Cell<ObjectId>,
}

impl MockControlPlane {
    /// Create a new empty mock control plane
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            ..Default::default()
        }
    }

    fn allocate_id(&self) -> ObjectId {
        let id = self.next_id.get().max(1);
        self.next_id.set(id + 1);
        id
    }

    /// Store an object built from `fields` and return its new id
    pub fn insert(&self, collection: &str, name: &str, fields: Value) -> ObjectId {
        let id = self.allocate_id();
        let mut resource = RemoteResource::new(id, name);
        if let Value::Object(map) = fields {
            for (key, value) in map {
                resource.set(key, value);
            }
        }
        self.objects
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .push(resource);
        id
    }

    /// Replace the members of an association
    pub fn link(&self, collection: &str, id: ObjectId, association: &str, members: &[ObjectId]) {
        self.links.borrow_mut().insert(
            (collection.to_string(), id, association.to_string()),
            members.iter().copied().collect(),
        );
    }

    /// Make every call of the given operation fail
    pub fn fail_on(&self, operation: Operation) {
        self.failing.borrow_mut().insert(operation.as_str());
    }

    /// Current state of an object
    pub fn get(&self, collection: &str, id: ObjectId) -> Option<RemoteResource> {
        self.objects
            .borrow()
            .get(collection)
            .and_then(|items| items.iter().find(|r| r.id == id).cloned())
    }

    /// Current members of an association
    pub fn linked(&self, collection: &str, id: ObjectId, association: &str) -> BTreeSet<ObjectId> {
        self.links
            .borrow()
            .get(&(collection.to_string(), id, association.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of objects in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.objects.borrow().get(collection).map_or(0, Vec::len)
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Only the calls that changed remote state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget the call log, keeping stored objects
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, operation: Operation, collection: &str) -> Result<()> {
        if self.failing.borrow().contains(operation.as_str()) {
            return Err(Error::RemoteRequest {
                operation,
                collection: collection.to_string(),
                message: "mock failure".to_string(),
                status: Some(500),
            });
        }
        Ok(())
    }

    fn with_object<T>(
        &self,
        operation: Operation,
        collection: &str,
        id: ObjectId,
        f: impl FnOnce(&mut RemoteResource) -> T,
    ) -> Result<T> {
        let mut objects = self.objects.borrow_mut();
        let resource = objects
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| Error::RemoteRequest {
                operation,
                collection: collection.to_string(),
                message: format!("object {id} does not exist"),
                status: Some(404),
            })?;
        Ok(f(resource))
    }
}

/// Render a field value the way it would appear in a query string
fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(resource: &RemoteResource, name_or_id: &str, filter: &Filter) -> bool {
    let by_name = resource.name == name_or_id;
    let by_id = name_or_id.parse::<ObjectId>().is_ok_and(|id| id == resource.id);
    (by_name || by_id)
        && filter.iter().all(|(field, expected)| {
            resource
                .value(field)
                .is_some_and(|actual| query_text(&actual) == *expected)
        })
}

impl ControlPlane for MockControlPlane {
    fn lookup(
        &self,
        collection: &str,
        name_or_id: &str,
        filter: &Filter,
    ) -> Result<Vec<RemoteResource>> {
        self.record(Call::Lookup {
            collection: collection.to_string(),
            name_or_id: name_or_id.to_string(),
            filter: filter.clone(),
        });
        self.check(Operation::Lookup, collection)?;
        Ok(self
            .objects
            .borrow()
            .get(collection)
            .map(|items| {
                items
                    .iter()
                    .filter(|r| matches(r, name_or_id, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn copy(
        &self,
        collection: &str,
        source: &RemoteResource,
        new_name: &str,
    ) -> Result<RemoteResource> {
        self.record(Call::Copy {
            collection: collection.to_string(),
            source: source.id,
            new_name: new_name.to_string(),
        });
        self.check(Operation::Copy, collection)?;

        let original = self.get(collection, source.id).ok_or_else(|| {
            Error::remote(Operation::Copy, collection, format!("object {} does not exist", source.id))
        })?;
        let mut duplicate = original;
        duplicate.id = self.allocate_id();
        duplicate.name = new_name.to_string();

        let copied_links: Vec<(LinkKey, BTreeSet<ObjectId>)> = self
            .links
            .borrow()
            .iter()
            .filter(|((c, id, _), _)| c == collection && *id == source.id)
            .map(|((c, _, a), members)| ((c.clone(), duplicate.id, a.clone()), members.clone()))
            .collect();
        self.links.borrow_mut().extend(copied_links);

        self.objects
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .push(duplicate.clone());
        Ok(duplicate)
    }

    fn create(&self, collection: &str, fields: &FieldMap) -> Result<RemoteResource> {
        self.record(Call::Create {
            collection: collection.to_string(),
            fields: fields.clone(),
        });
        self.check(Operation::Create, collection)?;

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::RemoteRequest {
                operation: Operation::Create,
                collection: collection.to_string(),
                message: "name: This field is required.".to_string(),
                status: Some(400),
            })?;
        let id = self.insert(collection, name, Value::Object(fields.clone()));
        self.get(collection, id)
            .ok_or_else(|| Error::remote(Operation::Create, collection, "created object vanished"))
    }

    fn update(
        &self,
        collection: &str,
        id: ObjectId,
        fields: &FieldMap,
    ) -> Result<RemoteResource> {
        self.record(Call::Update {
            collection: collection.to_string(),
            id,
            fields: fields.clone(),
        });
        self.check(Operation::Update, collection)?;
        self.with_object(Operation::Update, collection, id, |resource| {
            for (key, value) in fields {
                resource.set(key.clone(), value.clone());
            }
            resource.clone()
        })
    }

    fn delete(&self, collection: &str, id: ObjectId) -> Result<()> {
        self.record(Call::Delete {
            collection: collection.to_string(),
            id,
        });
        self.check(Operation::Delete, collection)?;
        if let Some(items) = self.objects.borrow_mut().get_mut(collection) {
            items.retain(|r| r.id != id);
        }
        self.links
            .borrow_mut()
            .retain(|(c, owner, _), _| !(c == collection && *owner == id));
        Ok(())
    }

    fn associated(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
    ) -> Result<BTreeSet<ObjectId>> {
        self.record(Call::Associated {
            collection: collection.to_string(),
            id,
            association: association.to_string(),
        });
        self.check(Operation::Lookup, collection)?;
        Ok(self.linked(collection, id, association))
    }

    fn associate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> Result<()> {
        self.record(Call::Associate {
            collection: collection.to_string(),
            id,
            association: association.to_string(),
            member,
        });
        self.check(Operation::Associate, collection)?;
        self.links
            .borrow_mut()
            .entry((collection.to_string(), id, association.to_string()))
            .or_default()
            .insert(member);
        Ok(())
    }

    fn disassociate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> Result<()> {
        self.record(Call::Disassociate {
            collection: collection.to_string(),
            id,
            association: association.to_string(),
            member,
        });
        self.check(Operation::Associate, collection)?;
        if let Some(members) = self
            .links
            .borrow_mut()
            .get_mut(&(collection.to_string(), id, association.to_string()))
        {
            members.remove(&member);
        }
        Ok(())
    }
}
