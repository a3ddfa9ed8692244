//! Apply context and the control-plane provider trait
//!
//! The reconciler never talks HTTP itself. It drives a [`ControlPlane`],
//! which lets the protocol run against a real API client or an in-memory
//! mock without changes.

use crate::error::Result;
use crate::types::{FieldMap, Filter, ObjectId, RemoteResource};
use std::collections::BTreeSet;

/// Operations the reconciler needs from the remote control plane
///
/// Every call is a blocking request/response exchange. Implementations must
/// not retry mutating requests; a failure is reported as
/// [`Error::RemoteRequest`](crate::Error::RemoteRequest).
pub trait ControlPlane {
    /// List objects in `collection` whose name equals `name_or_id`, or whose
    /// id equals it when it is numeric, restricted by `filter`.
    ///
    /// Returns every match; the caller decides what zero or many means.
    fn lookup(
        &self,
        collection: &str,
        name_or_id: &str,
        filter: &Filter,
    ) -> Result<Vec<RemoteResource>>;

    /// Duplicate `source` server side under `new_name`
    fn copy(
        &self,
        collection: &str,
        source: &RemoteResource,
        new_name: &str,
    ) -> Result<RemoteResource>;

    /// Create an object from `fields`
    fn create(&self, collection: &str, fields: &FieldMap) -> Result<RemoteResource>;

    /// Patch only `fields` on an existing object
    fn update(&self, collection: &str, id: ObjectId, fields: &FieldMap)
    -> Result<RemoteResource>;

    /// Delete an object. Deleting something already gone is not an error.
    fn delete(&self, collection: &str, id: ObjectId) -> Result<()>;

    /// Ids currently linked to `id` through `association`
    fn associated(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
    ) -> Result<BTreeSet<ObjectId>>;

    /// Link `member` to `id` through `association`
    fn associate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> Result<()>;

    /// Unlink `member` from `id` through `association`
    fn disassociate(
        &self,
        collection: &str,
        id: ObjectId,
        association: &str,
        member: ObjectId,
    ) -> Result<()>;
}

/// Context passed to every step that may mutate remote state
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Plan mutations without issuing them
    pub dry_run: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Context that only plans (check mode)
    pub fn check() -> Self {
        Self { dry_run: true }
    }
}
