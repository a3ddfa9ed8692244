//! Many-to-many association reconciliation
//!
//! Each declared category converges to exactly the declared members:
//! members missing remotely are added, extra remote members are removed,
//! and members present on both sides are left alone.

use crate::context::{ApplyContext, ControlPlane};
use crate::error::Result;
use crate::resolver::Resolver;
use crate::types::{AssociationSpec, Change, ObjectId};
use std::collections::{BTreeMap, BTreeSet};

/// Declared members of one category, resolved to ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssociation {
    pub name: String,
    /// Ids in declared order, without duplicates
    pub members: Vec<ObjectId>,
}

/// Minimal set of link changes for one category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationPlan {
    pub add: Vec<ObjectId>,
    pub remove: Vec<ObjectId>,
}

impl AssociationPlan {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compute the symmetric difference between current and desired members
///
/// Additions keep the declared order.
pub fn plan_association(current: &BTreeSet<ObjectId>, desired: &[ObjectId]) -> AssociationPlan {
    let wanted: BTreeSet<ObjectId> = desired.iter().copied().collect();
    AssociationPlan {
        add: desired
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .collect(),
        remove: current.difference(&wanted).copied().collect(),
    }
}

/// Resolve every declared member of every category
///
/// Any unresolvable name fails the whole run before anything is linked.
pub fn resolve_associations<C: ControlPlane + ?Sized>(
    resolver: &Resolver<'_, C>,
    declared: &BTreeMap<String, AssociationSpec>,
) -> Result<Vec<ResolvedAssociation>> {
    declared
        .iter()
        .map(|(name, spec)| {
            let mut members: Vec<ObjectId> = Vec::with_capacity(spec.references.len());
            for reference in &spec.references {
                let id = resolver.resolve(&spec.collection, reference)?;
                if !members.contains(&id) {
                    members.push(id);
                }
            }
            Ok(ResolvedAssociation {
                name: name.clone(),
                members,
            })
        })
        .collect()
}

/// Converge the associations of one resource
///
/// `resource_id` is `None` only when the resource is planned but not yet
/// created (check mode); every declared member is then an addition.
/// Removals are issued before additions.
pub fn reconcile_associations<C: ControlPlane + ?Sized>(
    plane: &C,
    collection: &str,
    resource_id: Option<ObjectId>,
    resolved: &[ResolvedAssociation],
    ctx: &ApplyContext,
) -> Result<Vec<Change>> {
    let mut changes = Vec::new();

    for association in resolved {
        let current = match resource_id {
            Some(id) => plane.associated(collection, id, &association.name)?,
            None => BTreeSet::new(),
        };
        let plan = plan_association(&current, &association.members);
        if plan.is_empty() {
            log::debug!("{} already match on {collection}", association.name);
            continue;
        }

        for member in plan.remove {
            if let (Some(id), false) = (resource_id, ctx.dry_run) {
                log::info!("Removing {} {member} from {collection} {id}", association.name);
                plane.disassociate(collection, id, &association.name, member)?;
            }
            changes.push(Change::Disassociated {
                association: association.name.clone(),
                id: member,
            });
        }

        for member in plan.add {
            if let (Some(id), false) = (resource_id, ctx.dry_run) {
                log::info!("Adding {} {member} to {collection} {id}", association.name);
                plane.associate(collection, id, &association.name, member)?;
            }
            changes.push(Change::Associated {
                association: association.name.clone(),
                id: member,
            });
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::{Call, MockControlPlane};
    use serde_json::json;

    #[test]
    fn test_plan_symmetric_difference() {
        let current = BTreeSet::from([1, 2, 3]);
        let plan = plan_association(&current, &[2, 4]);
        assert_eq!(plan.add, vec![4]);
        assert_eq!(plan.remove, vec![1, 3]);
    }

    #[test]
    fn test_plan_keeps_declared_order() {
        let plan = plan_association(&BTreeSet::new(), &[9, 3, 5]);
        assert_eq!(plan.add, vec![9, 3, 5]);
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn test_plan_empty_desired_removes_all() {
        let plan = plan_association(&BTreeSet::from([4, 5]), &[]);
        assert!(plan.add.is_empty());
        assert_eq!(plan.remove, vec![4, 5]);
    }

    #[test]
    fn test_resolve_collapses_duplicates() {
        let plane = MockControlPlane::new();
        let geneva = plane.insert("instance_groups", "geneva", json!({}));
        let declared = BTreeMap::from([(
            "instance_groups".to_string(),
            AssociationSpec {
                collection: "instance_groups".into(),
                references: vec!["geneva".into(), geneva.to_string()],
            },
        )]);
        let resolved = resolve_associations(&Resolver::new(&plane), &declared).unwrap();
        assert_eq!(resolved[0].members, vec![geneva]);
    }

    #[test]
    fn test_resolve_unknown_member_fails() {
        let plane = MockControlPlane::new();
        let declared = BTreeMap::from([(
            "instance_groups".to_string(),
            AssociationSpec {
                collection: "instance_groups".into(),
                references: vec!["nowhere".into()],
            },
        )]);
        let err = resolve_associations(&Resolver::new(&plane), &declared).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "nowhere"));
    }

    #[test]
    fn test_reconcile_converges_minimally() {
        let plane = MockControlPlane::new();
        let id = plane.insert("inventories", "Foo", json!({}));
        plane.link("inventories", id, "instance_groups", &[1, 2, 3]);
        let resolved = vec![ResolvedAssociation {
            name: "instance_groups".into(),
            members: vec![2, 4],
        }];

        let changes =
            reconcile_associations(&plane, "inventories", Some(id), &resolved, &ApplyContext::default())
                .unwrap();

        assert_eq!(
            plane.linked("inventories", id, "instance_groups"),
            BTreeSet::from([2, 4])
        );
        assert_eq!(changes.len(), 3);
        let mutations = plane.mutations();
        assert_eq!(mutations.len(), 3);
        assert!(!mutations.iter().any(|c| matches!(
            c,
            Call::Associate { member: 2, .. } | Call::Disassociate { member: 2, .. }
        )));
        assert!(matches!(mutations[0], Call::Disassociate { member: 1, .. }));
        assert!(matches!(mutations[2], Call::Associate { member: 4, .. }));
    }

    #[test]
    fn test_reconcile_check_mode_plans_only() {
        let plane = MockControlPlane::new();
        let id = plane.insert("inventories", "Foo", json!({}));
        plane.link("inventories", id, "instance_groups", &[1]);
        let resolved = vec![ResolvedAssociation {
            name: "instance_groups".into(),
            members: vec![5],
        }];

        let changes =
            reconcile_associations(&plane, "inventories", Some(id), &resolved, &ApplyContext::check())
                .unwrap();

        assert_eq!(changes.len(), 2);
        assert!(plane.mutations().is_empty());
        assert_eq!(plane.linked("inventories", id, "instance_groups"), BTreeSet::from([1]));
    }

    #[test]
    fn test_reconcile_without_id_reads_nothing() {
        let plane = MockControlPlane::new();
        let resolved = vec![ResolvedAssociation {
            name: "instance_groups".into(),
            members: vec![5, 6],
        }];
        let changes =
            reconcile_associations(&plane, "inventories", None, &resolved, &ApplyContext::check())
                .unwrap();
        assert_eq!(changes.len(), 2);
        assert!(plane.calls().is_empty());
    }
}
