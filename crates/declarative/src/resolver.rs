//! Name to identifier resolution
//!
//! One generic capability for every collection: a lookup by name or id that
//! must match at most one object. Zero matches is `None` for [`Resolver::get_one`]
//! and [`Error::NotFound`] for [`Resolver::resolve`]; more than one is always
//! [`Error::AmbiguousName`].

use crate::context::ControlPlane;
use crate::error::{Error, Result};
use crate::types::{Filter, ObjectId, Reference, RemoteResource};

/// Read-only resolver over a control plane
pub struct Resolver<'a, C: ControlPlane + ?Sized> {
    plane: &'a C,
}

impl<'a, C: ControlPlane + ?Sized> Resolver<'a, C> {
    pub fn new(plane: &'a C) -> Self {
        Self { plane }
    }

    /// Fetch the single object matching `name_or_id` within `filter`
    ///
    /// Names are only unique within the scope expressed by `filter`, so an
    /// inventory lookup restricted to one organization never sees another
    /// organization's inventory of the same name.
    pub fn get_one(
        &self,
        collection: &str,
        name_or_id: &str,
        filter: &Filter,
    ) -> Result<Option<RemoteResource>> {
        log::debug!("Looking up {collection} '{name_or_id}' {filter:?}");
        let mut matches = self.plane.lookup(collection, name_or_id, filter)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(Error::AmbiguousName {
                collection: collection.to_string(),
                name: name_or_id.to_string(),
                count,
            }),
        }
    }

    /// Resolve `name_or_id` to the id of exactly one object
    pub fn resolve(&self, collection: &str, name_or_id: &str) -> Result<ObjectId> {
        self.get_one(collection, name_or_id, &Filter::new())?
            .map(|resource| resource.id)
            .ok_or_else(|| Error::not_found(collection, name_or_id))
    }

    /// Resolve a declared reference
    pub fn resolve_reference(&self, reference: &Reference) -> Result<ObjectId> {
        self.resolve(&reference.collection, &reference.name_or_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockControlPlane;
    use serde_json::json;

    #[test]
    fn test_resolve_by_name() {
        let plane = MockControlPlane::new();
        let id = plane.insert("organizations", "Bar", json!({}));
        let resolver = Resolver::new(&plane);
        assert_eq!(resolver.resolve("organizations", "Bar").unwrap(), id);
    }

    #[test]
    fn test_resolve_by_id() {
        let plane = MockControlPlane::new();
        let id = plane.insert("credentials", "insights", json!({}));
        let resolver = Resolver::new(&plane);
        assert_eq!(resolver.resolve("credentials", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_resolve_not_found() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let err = resolver.resolve("organizations", "Missing").unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { ref collection, ref name }
                if collection == "organizations" && name == "Missing"
        ));
    }

    #[test]
    fn test_resolve_ambiguous() {
        let plane = MockControlPlane::new();
        plane.insert("instance_groups", "geneva", json!({}));
        plane.insert("instance_groups", "geneva", json!({}));
        let resolver = Resolver::new(&plane);
        let err = resolver.resolve("instance_groups", "geneva").unwrap_err();
        assert!(matches!(err, Error::AmbiguousName { count: 2, .. }));
    }

    #[test]
    fn test_numeric_name_colliding_with_other_id_is_ambiguous() {
        let plane = MockControlPlane::new();
        let first = plane.insert("credentials", "alpha", json!({}));
        plane.insert("credentials", &first.to_string(), json!({}));
        let resolver = Resolver::new(&plane);
        let err = resolver
            .resolve("credentials", &first.to_string())
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousName { .. }));
    }

    #[test]
    fn test_get_one_absent_is_none() {
        let plane = MockControlPlane::new();
        let resolver = Resolver::new(&plane);
        let found = resolver
            .get_one("inventories", "Foo", &Filter::new())
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_get_one_is_scoped() {
        let plane = MockControlPlane::new();
        let a = plane.insert("organizations", "A", json!({}));
        let b = plane.insert("organizations", "B", json!({}));
        plane.insert("inventories", "Foo", json!({"organization": a}));
        let in_b = plane.insert("inventories", "Foo", json!({"organization": b}));

        let resolver = Resolver::new(&plane);
        let filter = Filter::from([("organization".to_string(), b.to_string())]);
        let found = resolver
            .get_one("inventories", "Foo", &filter)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, in_b);

        let unscoped = resolver.get_one("inventories", "Foo", &Filter::new());
        assert!(matches!(unscoped, Err(Error::AmbiguousName { count: 2, .. })));
    }
}
