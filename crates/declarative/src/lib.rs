//! # Declarative
//!
//! Idempotent reconciliation of named resources against a remote control
//! plane.
//!
//! A caller declares the desired state of one resource as a
//! [`ResourceDescriptor`]. A [`Reconciler`] looks up what exists, computes
//! the minimal create/update/delete, and converges many-to-many
//! associations, issuing only the remote calls needed. Running the same
//! declaration twice issues no mutations the second time.
//!
//! ## Core Concepts
//!
//! - **Resolver**: turns a name or numeric id into exactly one object
//! - **Cloner**: materializes a missing resource by copying a template
//! - **Field reconciler**: diffs declared fields against the remote object
//! - **Association reconciler**: converges link sets to the declared members
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     ApplyContext, FieldValue, MockControlPlane, ResourceDescriptor, Scope, Slot, reconcile,
//! };
//! use serde_json::json;
//!
//! let plane = MockControlPlane::new();
//! plane.insert("organizations", "Bar", json!({}));
//!
//! let desired = ResourceDescriptor::new(
//!     "inventories",
//!     "inventory",
//!     "Foo",
//!     Scope::new("organization", "organizations", "Bar"),
//! )
//! .field("description", Slot::Provided(FieldValue::text("Web servers")));
//!
//! let first = reconcile(&plane, &desired, ApplyContext::default()).unwrap();
//! assert!(first.changed());
//!
//! let second = reconcile(&plane, &desired, ApplyContext::default()).unwrap();
//! assert!(!second.changed());
//! ```
//!
//! ## Provider Trait
//!
//! [`ControlPlane`] is the only seam to the outside world. The `towerkit`
//! crate implements it over HTTP; [`MockControlPlane`] implements it in
//! memory for tests.

pub mod associations;
pub mod cloner;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod mock;
pub mod reconciler;
pub mod resolver;
pub mod types;

// Re-export main types at crate root
pub use associations::{
    AssociationPlan, ResolvedAssociation, plan_association, reconcile_associations,
    resolve_associations,
};
pub use cloner::{Cloned, Cloner};
pub use context::{ApplyContext, ControlPlane};
pub use diff::{Action, Target, TargetValue, reconcile_fields};
pub use error::{Error, Operation, Result};
pub use executor::{Applied, apply_action};
pub use mock::{Call, MockControlPlane};
pub use reconciler::{Reconciler, reconcile};
pub use resolver::Resolver;
pub use types::{
    AssociationSpec, Change, DesiredState, FieldMap, FieldValue, Filter, Kind, ObjectId,
    Outcome, Reference, RemoteResource, ResourceDescriptor, Scope, Slot,
};
