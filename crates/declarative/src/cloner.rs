//! Clone-from-template
//!
//! When the target does not exist yet, it is materialized by duplicating a
//! template server side instead of being created from scratch. The copy is
//! then treated as the current state, so declared fields still get applied.

use crate::context::{ApplyContext, ControlPlane};
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::types::{Filter, RemoteResource};

/// Result of a clone step
#[derive(Debug, Clone, PartialEq)]
pub struct Cloned {
    /// Resource to reconcile from here on
    pub resource: RemoteResource,
    /// Whether a copy was made (or would be, in check mode)
    pub copied: bool,
}

/// Duplicates templates through a control plane
pub struct Cloner<'a, C: ControlPlane + ?Sized> {
    plane: &'a C,
    resolver: Resolver<'a, C>,
}

impl<'a, C: ControlPlane + ?Sized> Cloner<'a, C> {
    pub fn new(plane: &'a C) -> Self {
        Self {
            plane,
            resolver: Resolver::new(plane),
        }
    }

    /// Produce `target_name` in `collection` by copying `template`
    ///
    /// An existing target is never overwritten: no copy is issued and the
    /// existing resource is returned, so re-running stays a no-op. The
    /// template lookup is not scoped, which allows copying across parents.
    ///
    /// `validate` sees the template before anything is copied, since the
    /// copy inherits the template's state.
    pub fn clone_into<F>(
        &self,
        current: Option<RemoteResource>,
        target_name: &str,
        template: &str,
        collection: &str,
        ctx: &ApplyContext,
        validate: F,
    ) -> Result<Cloned>
    where
        F: FnOnce(&RemoteResource) -> Result<()>,
    {
        if let Some(existing) = current {
            log::warn!(
                "{collection} '{target_name}' already exists (id {}), not copying from '{template}'",
                existing.id
            );
            return Ok(Cloned {
                resource: existing,
                copied: false,
            });
        }

        let source = self
            .resolver
            .get_one(collection, template, &Filter::new())?
            .ok_or_else(|| Error::not_found(collection, template))?;
        validate(&source)?;

        if ctx.dry_run {
            log::info!("Would copy {collection} '{}' to '{target_name}'", source.name);
            let mut preview = source;
            preview.name = target_name.to_string();
            return Ok(Cloned {
                resource: preview,
                copied: true,
            });
        }

        log::info!(
            "Copying {collection} '{}' (id {}) to '{target_name}'",
            source.name,
            source.id
        );
        let resource = self.plane.copy(collection, &source, target_name)?;
        Ok(Cloned {
            resource,
            copied: true,
        })
    }
}
