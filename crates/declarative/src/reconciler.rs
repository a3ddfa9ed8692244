//! The reconciliation run
//!
//! One resource per run, strictly in this order:
//!
//! ```text
//! resolve scope -> look up existing -> [clone] -> absent? delete : (
//!     validate kind -> resolve references -> create/update -> associations)
//! ```
//!
//! The first error aborts the run. Mutations already issued are not rolled
//! back, so a failed run leaves the resource matching some prefix of the
//! declared changes.

use crate::associations::{reconcile_associations, resolve_associations};
use crate::cloner::Cloner;
use crate::context::{ApplyContext, ControlPlane};
use crate::diff::{build_target, check_kind_transition, diff_fields, plan_absent};
use crate::error::Result;
use crate::executor::apply_action;
use crate::resolver::Resolver;
use crate::types::{Change, Filter, Outcome, ResourceDescriptor};

/// Drives a single reconciliation against a control plane
pub struct Reconciler<'a, C: ControlPlane + ?Sized> {
    plane: &'a C,
    ctx: ApplyContext,
}

impl<'a, C: ControlPlane + ?Sized> Reconciler<'a, C> {
    pub fn new(plane: &'a C, ctx: ApplyContext) -> Self {
        Self { plane, ctx }
    }

    /// Make the remote resource match `desired`
    pub fn run(&self, desired: &ResourceDescriptor) -> Result<Outcome> {
        let resolver = Resolver::new(self.plane);
        let mut outcome = Outcome::new(&desired.name, self.ctx.dry_run);

        let scope_id = resolver.resolve(&desired.scope.collection, &desired.scope.name_or_id)?;
        let filter = Filter::from([(desired.scope.field.clone(), scope_id.to_string())]);
        let mut current = resolver.get_one(&desired.collection, &desired.name, &filter)?;

        if desired.state.is_absent() {
            let action = plan_absent(current.as_ref());
            let applied =
                apply_action(self.plane, &desired.collection, current, action, &self.ctx)?;
            if let Some(Change::Deleted { id }) = &applied.change {
                outcome.id = Some(*id);
            }
            outcome.changes.extend(applied.change);
            return Ok(outcome);
        }

        if let Some(template) = &desired.copy_from {
            let cloned = Cloner::new(self.plane).clone_into(
                current.take(),
                &desired.name,
                template,
                &desired.collection,
                &self.ctx,
                |source| check_kind_transition(Some(source), desired),
            )?;
            if cloned.copied {
                outcome.copied = true;
                outcome.push(Change::Copied {
                    from: template.clone(),
                });
            }
            current = Some(cloned.resource);
        }

        check_kind_transition(current.as_ref(), desired)?;
        let target = build_target(&resolver, current.as_ref(), desired, scope_id)?;
        let associations = resolve_associations(&resolver, &desired.associations)?;

        let action = diff_fields(current.as_ref(), &target);
        let applied = apply_action(self.plane, &desired.collection, current, action, &self.ctx)?;
        outcome.changes.extend(applied.change);

        // A check-mode preview of a clone carries the template id; its
        // associations are the template's, which is what the copy would get.
        let resource_id = applied.resource.as_ref().map(|r| r.id);
        outcome.id = if outcome.copied && self.ctx.dry_run {
            None
        } else {
            resource_id
        };

        let changes = reconcile_associations(
            self.plane,
            &desired.collection,
            resource_id,
            &associations,
            &self.ctx,
        )?;
        outcome.changes.extend(changes);

        Ok(outcome)
    }
}

/// Reconcile `desired` once with a fresh reconciler
pub fn reconcile<C: ControlPlane + ?Sized>(
    plane: &C,
    desired: &ResourceDescriptor,
    ctx: ApplyContext,
) -> Result<Outcome> {
    Reconciler::new(plane, ctx).run(desired)
}
