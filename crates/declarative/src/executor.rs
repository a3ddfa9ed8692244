//! Execution of field actions against a control plane

use crate::context::{ApplyContext, ControlPlane};
use crate::diff::Action;
use crate::error::Result;
use crate::types::{Change, FieldMap, RemoteResource};

/// What executing an action produced
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Resource after the action; `None` after a delete or a planned create
    pub resource: Option<RemoteResource>,
    /// Change recorded for the outcome, if the action was not a no-op
    pub change: Option<Change>,
}

/// Execute one action
///
/// In check mode nothing is sent; the change is still reported so callers
/// see what a real run would do.
pub fn apply_action<C: ControlPlane + ?Sized>(
    plane: &C,
    collection: &str,
    current: Option<RemoteResource>,
    action: Action,
    ctx: &ApplyContext,
) -> Result<Applied> {
    match action {
        Action::NoOp => Ok(Applied {
            resource: current,
            change: None,
        }),

        Action::Create(fields) => {
            let resource = if ctx.dry_run {
                log::info!("Would create {collection} {}", describe(&fields));
                None
            } else {
                let created = plane.create(collection, &fields)?;
                log::info!("Created {collection} '{}' (id {})", created.name, created.id);
                Some(created)
            };
            Ok(Applied {
                resource,
                change: Some(Change::Created { fields }),
            })
        }

        Action::Update { id, changed } => {
            let previous: FieldMap = current
                .as_ref()
                .map(|r| {
                    changed
                        .keys()
                        .map(|k| (k.clone(), r.value(k).unwrap_or_default()))
                        .collect()
                })
                .unwrap_or_default();

            let resource = if ctx.dry_run {
                log::info!("Would update {collection} {id}: {}", describe(&changed));
                current
            } else {
                log::info!("Updating {collection} {id}: {}", describe(&changed));
                Some(plane.update(collection, id, &changed)?)
            };
            Ok(Applied {
                resource,
                change: Some(Change::Updated {
                    fields: changed,
                    previous,
                }),
            })
        }

        Action::Delete(id) => {
            if ctx.dry_run {
                log::info!("Would delete {collection} {id}");
            } else {
                log::info!("Deleting {collection} {id}");
                plane.delete(collection, id)?;
            }
            Ok(Applied {
                resource: None,
                change: Some(Change::Deleted { id }),
            })
        }
    }
}

/// Field names of a change, for log lines
fn describe(fields: &FieldMap) -> String {
    fields.keys().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockControlPlane};
    use serde_json::{Value, json};

    fn fields(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_apply_noop_issues_nothing() {
        let plane = MockControlPlane::new();
        let current = RemoteResource::new(7, "Foo");
        let applied = apply_action(
            &plane,
            "inventories",
            Some(current.clone()),
            Action::NoOp,
            &ApplyContext::default(),
        )
        .unwrap();
        assert_eq!(applied.resource, Some(current));
        assert!(applied.change.is_none());
        assert!(plane.calls().is_empty());
    }

    #[test]
    fn test_apply_create() {
        let plane = MockControlPlane::new();
        let applied = apply_action(
            &plane,
            "inventories",
            None,
            Action::Create(fields(json!({"name": "Foo", "kind": ""}))),
            &ApplyContext::default(),
        )
        .unwrap();
        let created = applied.resource.unwrap();
        assert_eq!(created.name, "Foo");
        assert_eq!(plane.count("inventories"), 1);
    }

    #[test]
    fn test_apply_update_records_previous() {
        let plane = MockControlPlane::new();
        let id = plane.insert("inventories", "Foo", json!({"description": "old"}));
        let current = plane.get("inventories", id);

        let applied = apply_action(
            &plane,
            "inventories",
            current,
            Action::Update {
                id,
                changed: fields(json!({"description": "new"})),
            },
            &ApplyContext::default(),
        )
        .unwrap();

        assert_eq!(
            applied.change,
            Some(Change::Updated {
                fields: fields(json!({"description": "new"})),
                previous: fields(json!({"description": "old"})),
            })
        );
        assert_eq!(
            plane.get("inventories", id).unwrap().value("description"),
            Some(json!("new"))
        );
    }

    #[test]
    fn test_apply_delete() {
        let plane = MockControlPlane::new();
        let id = plane.insert("inventories", "Foo", json!({}));
        let applied = apply_action(
            &plane,
            "inventories",
            plane.get("inventories", id),
            Action::Delete(id),
            &ApplyContext::default(),
        )
        .unwrap();
        assert!(applied.resource.is_none());
        assert_eq!(
            plane.mutations(),
            vec![Call::Delete {
                collection: "inventories".into(),
                id,
            }]
        );
    }

    #[test]
    fn test_apply_check_mode_sends_nothing() {
        let plane = MockControlPlane::new();
        let applied = apply_action(
            &plane,
            "inventories",
            None,
            Action::Create(fields(json!({"name": "Foo"}))),
            &ApplyContext::check(),
        )
        .unwrap();
        assert!(applied.resource.is_none());
        assert!(matches!(applied.change, Some(Change::Created { .. })));
        assert!(plane.calls().is_empty());
    }
}
