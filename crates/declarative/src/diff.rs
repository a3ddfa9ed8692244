//! Field reconciliation
//!
//! Turns a descriptor and the current remote state into at most one
//! create, update or delete. Updates carry only the fields whose value
//! differs: the server rejects some fields when they are resubmitted with
//! formatting differences, so unchanged fields are never sent.

use crate::context::ControlPlane;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::types::{FieldMap, FieldValue, ObjectId, RemoteResource, ResourceDescriptor, Slot};
use serde_json::Value;

/// The single field-level operation a run performs
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nothing to do
    NoOp,
    /// Create with the complete target fields
    Create(FieldMap),
    /// Patch only the changed fields
    Update { id: ObjectId, changed: FieldMap },
    /// Delete; terminal for the run
    Delete(ObjectId),
}

impl Action {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// A resolved target value and how it compares against the remote one
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValue {
    /// Compared by JSON equality, empties equal
    Plain(Value),
    /// Serialized to a string on the wire, compared semantically
    Structured(Value),
}

impl TargetValue {
    /// Value as sent to the control plane
    pub fn wire(&self) -> Value {
        match self {
            Self::Plain(value) => value.clone(),
            Self::Structured(value) => Value::String(value.to_string()),
        }
    }

    /// Whether the remote value already satisfies this target
    pub fn matches(&self, current: Option<&Value>) -> bool {
        let current = current.unwrap_or(&Value::Null);
        match self {
            Self::Plain(target) => current == target || (is_empty(current) && is_empty(target)),
            Self::Structured(target) => {
                parse_structured(current).is_some_and(|parsed| {
                    parsed == *target || (is_empty_structure(&parsed) && is_empty_structure(target))
                })
            }
        }
    }
}

/// Complete set of fields the resource should have, in declaration order
pub type Target = Vec<(String, TargetValue)>;

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_empty_structure(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Parse a remote structured value. Strings may hold JSON or YAML.
fn parse_structured(current: &Value) -> Option<Value> {
    match current {
        Value::Null => Some(Value::Null),
        Value::String(text) if matches!(text.trim(), "" | "---") => Some(Value::Null),
        Value::String(text) => serde_yaml::from_str::<Value>(text).ok(),
        other => Some(other.clone()),
    }
}

/// Plan for a resource that must not exist
pub fn plan_absent(current: Option<&RemoteResource>) -> Action {
    match current {
        None => Action::NoOp,
        Some(resource) => Action::Delete(resource.id),
    }
}

/// Refuse to turn a default-kind resource into a special kind
pub fn check_kind_transition(
    current: Option<&RemoteResource>,
    desired: &ResourceDescriptor,
) -> Result<()> {
    if let Some(resource) = current
        && resource.kind().is_default()
        && !desired.kind.is_default()
    {
        return Err(Error::InvalidTransition(format!(
            "cannot turn a regular {} into a \"{}\" {} ({} '{}' already exists with the default kind)",
            desired.item_type, desired.kind, desired.item_type, desired.collection, resource.name
        )));
    }
    Ok(())
}

/// Build the complete target field set, resolving references
///
/// The name of an existing resource is preserved: renames never happen
/// implicitly. Only provided slots are included.
pub fn build_target<C: ControlPlane + ?Sized>(
    resolver: &Resolver<'_, C>,
    current: Option<&RemoteResource>,
    desired: &ResourceDescriptor,
    scope_id: ObjectId,
) -> Result<Target> {
    let name = current.map_or_else(|| desired.name.clone(), |r| r.name.clone());

    let mut target: Target = vec![
        ("name".to_string(), TargetValue::Plain(Value::String(name))),
        (
            desired.scope.field.clone(),
            TargetValue::Plain(Value::from(scope_id)),
        ),
        (
            "kind".to_string(),
            TargetValue::Plain(Value::String(desired.kind.as_str().to_string())),
        ),
    ];

    for (field, slot) in &desired.fields {
        let Slot::Provided(value) = slot else {
            continue;
        };
        let resolved = match value {
            FieldValue::Plain(v) => TargetValue::Plain(v.clone()),
            FieldValue::Structured(v) => TargetValue::Structured(v.clone()),
            FieldValue::Reference(reference) => {
                TargetValue::Plain(Value::from(resolver.resolve_reference(reference)?))
            }
        };
        target.push((field.clone(), resolved));
    }

    Ok(target)
}

/// Compute the field action for a present resource
pub fn diff_fields(current: Option<&RemoteResource>, target: &Target) -> Action {
    let Some(resource) = current else {
        return Action::Create(
            target
                .iter()
                .map(|(field, value)| (field.clone(), value.wire()))
                .collect(),
        );
    };

    let changed: FieldMap = target
        .iter()
        .filter(|(field, value)| !value.matches(resource.value(field).as_ref()))
        .map(|(field, value)| (field.clone(), value.wire()))
        .collect();

    if changed.is_empty() {
        Action::NoOp
    } else {
        Action::Update {
            id: resource.id,
            changed,
        }
    }
}

/// Compute the single field-level action for `desired`
///
/// Absent resources yield `NoOp` or `Delete`. Present ones are validated
/// against the kind invariant first, then diffed field by field.
pub fn reconcile_fields<C: ControlPlane + ?Sized>(
    resolver: &Resolver<'_, C>,
    current: Option<&RemoteResource>,
    desired: &ResourceDescriptor,
    scope_id: ObjectId,
) -> Result<Action> {
    if desired.state.is_absent() {
        return Ok(plan_absent(current));
    }
    check_kind_transition(current, desired)?;
    let target = build_target(resolver, current, desired, scope_id)?;
    Ok(diff_fields(current, &target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockControlPlane;
    use crate::types::{DesiredState, Kind, Reference, Scope};
    use serde_json::json;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "inventories",
            "inventory",
            "Foo",
            Scope::new("organization", "organizations", "Bar"),
        )
    }

    fn map(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_plan_absent() {
        assert_eq!(plan_absent(None), Action::NoOp);
        let resource = RemoteResource::new(7, "Foo");
        assert_eq!(plan_absent(Some(&resource)), Action::Delete(7));
    }

    #[test]
    fn test_create_contains_name_scope_and_kind() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let action = reconcile_fields(&resolver, None, &descriptor(), 3).unwrap();
        assert_eq!(
            action,
            Action::Create(map(json!({"name": "Foo", "organization": 3, "kind": ""})))
        );
    }

    #[test]
    fn test_absent_slots_are_not_sent() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let desired = descriptor()
            .field("description", Slot::Provided(FieldValue::text("Ours")))
            .field("host_filter", Slot::Absent);
        let Action::Create(fields) = reconcile_fields(&resolver, None, &desired, 3).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(fields.get("description"), Some(&json!("Ours")));
        assert!(!fields.contains_key("host_filter"));
    }

    #[test]
    fn test_update_sends_only_changed_fields() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo")
            .with_field("organization", json!(3))
            .with_field("kind", json!(""))
            .with_field("description", json!("old"))
            .with_field("host_filter", json!("name=web*"));
        let desired = descriptor().field("description", Slot::Provided(FieldValue::text("new")));

        let action = reconcile_fields(&resolver, Some(&current), &desired, 3).unwrap();
        assert_eq!(
            action,
            Action::Update {
                id: 7,
                changed: map(json!({"description": "new"})),
            }
        );
    }

    #[test]
    fn test_matching_resource_is_noop() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo")
            .with_field("organization", json!(3))
            .with_field("kind", json!(""))
            .with_field("description", Value::Null);
        let desired = descriptor().field("description", Slot::Provided(FieldValue::text("")));

        let action = reconcile_fields(&resolver, Some(&current), &desired, 3).unwrap();
        assert!(action.is_noop());
    }

    #[test]
    fn test_existing_name_is_preserved() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "foo")
            .with_field("organization", json!(3))
            .with_field("kind", json!(""));
        let action = reconcile_fields(&resolver, Some(&current), &descriptor(), 3).unwrap();
        assert!(action.is_noop());
    }

    #[test]
    fn test_scope_change_is_updated() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo")
            .with_field("organization", json!(1))
            .with_field("kind", json!(""));
        let action = reconcile_fields(&resolver, Some(&current), &descriptor(), 3).unwrap();
        assert_eq!(
            action,
            Action::Update {
                id: 7,
                changed: map(json!({"organization": 3})),
            }
        );
    }

    #[test]
    fn test_kind_transition_rejected() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo").with_field("kind", json!(""));
        let desired = descriptor().kind(Kind::new("smart"));

        let err = reconcile_fields(&resolver, Some(&current), &desired, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert!(err.to_string().contains("smart"));
    }

    #[test]
    fn test_kind_allowed_on_create() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let desired = descriptor().kind(Kind::new("smart"));
        let action = reconcile_fields(&resolver, None, &desired, 3).unwrap();
        assert!(matches!(action, Action::Create(ref f) if f["kind"] == json!("smart")));
    }

    #[test]
    fn test_absent_skips_kind_check() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo");
        let desired = descriptor()
            .kind(Kind::new("smart"))
            .state(DesiredState::Absent);
        let action = reconcile_fields(&resolver, Some(&current), &desired, 3).unwrap();
        assert_eq!(action, Action::Delete(7));
    }

    #[test]
    fn test_reference_resolved_before_compare() {
        let plane = MockControlPlane::new();
        let credential = plane.insert("credentials", "insights", json!({}));
        let resolver = Resolver::new(&plane);
        let current = RemoteResource::new(7, "Foo")
            .with_field("organization", json!(3))
            .with_field("kind", json!(""))
            .with_field("insights_credential", json!(credential));
        let desired = descriptor().field(
            "insights_credential",
            Slot::Provided(FieldValue::Reference(Reference::new("credentials", "insights"))),
        );

        let action = reconcile_fields(&resolver, Some(&current), &desired, 3).unwrap();
        assert!(action.is_noop());
    }

    #[test]
    fn test_unresolvable_reference_fails() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let desired = descriptor().field(
            "insights_credential",
            Slot::Provided(FieldValue::Reference(Reference::new("credentials", "nope"))),
        );
        let err = reconcile_fields(&resolver, None, &desired, 3).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_structured_compares_semantically() {
        let target = TargetValue::Structured(json!({"ansible_user": "admin", "port": 22}));
        assert!(target.matches(Some(&json!("{\"port\": 22, \"ansible_user\": \"admin\"}"))));
        assert!(target.matches(Some(&json!("---\nansible_user: admin\nport: 22\n"))));
        assert!(!target.matches(Some(&json!("{\"port\": 23, \"ansible_user\": \"admin\"}"))));
        assert!(!target.matches(Some(&json!("not: [valid"))));
    }

    #[test]
    fn test_structured_empty_equivalents() {
        let target = TargetValue::Structured(json!({}));
        assert!(target.matches(Some(&json!(""))));
        assert!(target.matches(Some(&json!("---"))));
        assert!(target.matches(None));
        assert!(!target.matches(Some(&json!("a: 1"))));
    }

    #[test]
    fn test_structured_wire_is_json_string() {
        let target = TargetValue::Structured(json!({"a": 1}));
        assert_eq!(target.wire(), json!("{\"a\":1}"));
    }

    #[test]
    fn test_plain_empty_equivalents() {
        assert!(TargetValue::Plain(json!("")).matches(None));
        assert!(TargetValue::Plain(json!("")).matches(Some(&Value::Null)));
        assert!(TargetValue::Plain(Value::Null).matches(Some(&json!(""))));
        assert!(!TargetValue::Plain(json!("x")).matches(Some(&json!(""))));
        assert!(!TargetValue::Plain(json!(3)).matches(Some(&json!("3"))));
    }
}
