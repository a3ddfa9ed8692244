//! Core types for declarative resource reconciliation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier assigned by the control plane.
pub type ObjectId = u64;

/// Field name to wire value, as sent to or read from the control plane.
pub type FieldMap = serde_json::Map<String, Value>;

/// Extra equality filters that narrow a lookup (e.g. `organization=3`).
pub type Filter = BTreeMap<String, String>;

/// Whether the resource should exist after the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Resource must exist and match the declaration
    #[default]
    Present,
    /// Resource must not exist
    Absent,
}

impl DesiredState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// An optional field slot.
///
/// `Absent` means the caller never mentioned the field: it is neither sent
/// nor compared, so existing values survive partial declarations.
/// `Provided` carries the declared value, even when that value is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot<T> {
    /// Not declared by the caller
    #[default]
    Absent,
    /// Declared by the caller
    Provided(T),
}

impl<T> Slot<T> {
    /// Whether the caller declared this slot
    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided(_))
    }

    /// Borrow the declared value
    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Self::Absent => Slot::Absent,
            Self::Provided(v) => Slot::Provided(v),
        }
    }

    /// Map the declared value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Slot<U> {
        match self {
            Self::Absent => Slot::Absent,
            Self::Provided(v) => Slot::Provided(f(v)),
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Self::Absent,
            Some(v) => Self::Provided(v),
        }
    }
}

/// A reference to another resource by name or id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Collection the referenced object lives in (e.g. "credentials")
    pub collection: String,
    /// Name or numeric id of the referenced object
    pub name_or_id: String,
}

impl Reference {
    pub fn new(collection: impl Into<String>, name_or_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name_or_id: name_or_id.into(),
        }
    }
}

/// Declared value of a field before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Sent as-is, compared by JSON equality
    Plain(Value),
    /// Structured data stored remotely as a serialized string
    Structured(Value),
    /// Name of another resource, sent as its id
    Reference(Reference),
}

impl FieldValue {
    /// Plain string value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Plain(Value::String(value.into()))
    }
}

/// Immutable subtype tag of a resource. The empty tag is the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Whether this is the default (empty) tag
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("(default)")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Parent scope a resource name is unique within
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Field on the resource holding the parent id (e.g. "organization")
    pub field: String,
    /// Collection of the parent (e.g. "organizations")
    pub collection: String,
    /// Name or id of the parent
    pub name_or_id: String,
}

impl Scope {
    pub fn new(
        field: impl Into<String>,
        collection: impl Into<String>,
        name_or_id: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            collection: collection.into(),
            name_or_id: name_or_id.into(),
        }
    }
}

/// Declared members of one many-to-many association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSpec {
    /// Collection the members live in
    pub collection: String,
    /// Names or ids, in declared order
    pub references: Vec<String>,
}

/// Everything the caller wants to be true about one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// Collection the resource lives in (e.g. "inventories")
    pub collection: String,
    /// Singular type name used in messages (e.g. "inventory")
    pub item_type: String,
    /// Name, unique within the parent scope
    pub name: String,
    /// Parent scope
    pub scope: Scope,
    /// Desired presence
    pub state: DesiredState,
    /// Subtype tag, always part of the target fields
    pub kind: Kind,
    /// Optional field slots in declaration order
    pub fields: Vec<(String, Slot<FieldValue>)>,
    /// Declared associations; undeclared categories are left alone
    pub associations: BTreeMap<String, AssociationSpec>,
    /// Template to copy from when the resource does not exist yet
    pub copy_from: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(
        collection: impl Into<String>,
        item_type: impl Into<String>,
        name: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            collection: collection.into(),
            item_type: item_type.into(),
            name: name.into(),
            scope,
            state: DesiredState::Present,
            kind: Kind::default(),
            fields: Vec::new(),
            associations: BTreeMap::new(),
            copy_from: None,
        }
    }

    pub fn state(mut self, state: DesiredState) -> Self {
        self.state = state;
        self
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Declare an optional field slot
    pub fn field(mut self, name: impl Into<String>, value: Slot<FieldValue>) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, value));
        self
    }

    /// Declare an association; an absent slot leaves the category untouched
    pub fn association(
        mut self,
        name: impl Into<String>,
        collection: impl Into<String>,
        references: Slot<Vec<String>>,
    ) -> Self {
        let name = name.into();
        match references {
            Slot::Provided(references) => {
                self.associations.insert(
                    name,
                    AssociationSpec {
                        collection: collection.into(),
                        references,
                    },
                );
            }
            Slot::Absent => {
                self.associations.remove(&name);
            }
        }
        self
    }

    pub fn copy_from(mut self, template: Option<String>) -> Self {
        self.copy_from = template;
        self
    }

    /// Look up a declared slot by name
    pub fn slot(&self, name: &str) -> Slot<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map_or(Slot::Absent, |(_, slot)| slot.as_ref())
    }
}

/// An object as the control plane currently has it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub id: ObjectId,
    pub name: String,
    /// Links to related endpoints (e.g. "copy", "instance_groups")
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub related: FieldMap,
    /// Every other field, verbatim
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl RemoteResource {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            related: FieldMap::new(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Current value of a field, including `id` and `name`
    pub fn value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::from(self.id)),
            "name" => Some(Value::String(self.name.clone())),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// Overwrite a field, routing `name` to the name slot
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        match (field.as_str(), &value) {
            ("name", Value::String(name)) => self.name = name.clone(),
            ("id", _) => {}
            _ => {
                self.fields.insert(field, value);
            }
        }
    }

    /// Subtype tag; missing or null means the default tag
    pub fn kind(&self) -> Kind {
        match self.fields.get("kind") {
            Some(Value::String(tag)) => Kind::new(tag.clone()),
            _ => Kind::default(),
        }
    }

    /// Related endpoint path, if the control plane advertised one
    pub fn related_link(&self, key: &str) -> Option<&str> {
        self.related.get(key).and_then(Value::as_str)
    }
}

/// One remote change made (or planned, in check mode) during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Change {
    /// Resource was duplicated from a template
    Copied { from: String },
    /// Resource was created with these fields
    Created { fields: FieldMap },
    /// These fields were changed; `previous` holds their old values
    Updated { fields: FieldMap, previous: FieldMap },
    /// Resource was deleted
    Deleted { id: ObjectId },
    /// A member was added to an association
    Associated { association: String, id: ObjectId },
    /// A member was removed from an association
    Disassociated { association: String, id: ObjectId },
}

/// Result of reconciling one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    /// Name of the reconciled resource
    pub name: String,
    /// Id of the resource after the run (the deleted id for deletions)
    pub id: Option<ObjectId>,
    /// Whether the resource was produced by copying a template
    pub copied: bool,
    /// Whether mutations were only planned
    pub check_mode: bool,
    /// Changes in the order they were issued
    pub changes: Vec<Change>,
}

impl Outcome {
    pub fn new(name: impl Into<String>, check_mode: bool) -> Self {
        Self {
            name: name.into(),
            check_mode,
            ..Default::default()
        }
    }

    /// Whether the run changed (or would change) anything
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Record a change
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }
}
