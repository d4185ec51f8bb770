//! Read-only impact estimation for delete and restore cascades.
//!
//! Planning never writes and never blocks; a plan can go stale against
//! concurrent writes, which is why the executor re-runs the traversal
//! itself at execution time.

use std::collections::VecDeque;

use rusqlite::Connection;
use uuid::Uuid;

use super::LifecycleError;
use crate::db::repository::{get_entity, list_cascaded_from};
use crate::db::DatabaseError;
use crate::hierarchy::{child_nodes, SubtreeNode};
use crate::models::{CascadePlan, DeletionOrigin, PerKindCounts};

/// Descendants partitioned by whether a delete cascade would touch them.
pub(crate) struct DeleteTraversal {
    /// Not yet deleted; a delete would stamp these as cascaded.
    pub live: Vec<SubtreeNode>,
    /// Already deleted (any origin); never re-stamped. Traversal stops
    /// here — by invariant their whole subtree is already deleted.
    pub already_deleted: Vec<SubtreeNode>,
}

/// Breadth-first walk from `root_id`, stopping at already-deleted nodes.
pub(crate) fn traverse_for_delete(
    conn: &Connection,
    root_id: &Uuid,
) -> Result<DeleteTraversal, DatabaseError> {
    let mut live = Vec::new();
    let mut already_deleted = Vec::new();
    let mut queue = VecDeque::from([*root_id]);

    while let Some(id) = queue.pop_front() {
        for child in child_nodes(conn, &id)? {
            if child.is_deleted {
                already_deleted.push(child);
            } else {
                queue.push_back(child.id);
                live.push(child);
            }
        }
    }

    Ok(DeleteTraversal {
        live,
        already_deleted,
    })
}

/// Estimate the impact of deleting `root_id`: what a delete cascade would
/// newly transition, plus how much of the subtree is already deleted.
///
/// Pure read; calling it twice with no intervening writes returns
/// identical results.
pub fn plan_delete(conn: &Connection, root_id: &Uuid) -> Result<CascadePlan, LifecycleError> {
    let root = get_entity(conn, root_id)?.ok_or(LifecycleError::NotFound(*root_id))?;
    let traversal = traverse_for_delete(conn, root_id)?;

    let mut per_kind_counts = PerKindCounts::default();
    let mut total_affected = 0u32;
    let mut already_deleted = traversal.already_deleted.len() as u32;

    if root.is_deleted {
        already_deleted += 1;
    } else {
        per_kind_counts.bump(root.kind);
        total_affected += 1;
    }
    for node in &traversal.live {
        per_kind_counts.bump(node.kind);
        total_affected += 1;
    }

    let descendant_ids = traversal
        .live
        .iter()
        .chain(traversal.already_deleted.iter())
        .map(|n| n.id)
        .collect();

    Ok(CascadePlan {
        root_id: *root_id,
        per_kind_counts,
        total_affected,
        already_deleted,
        descendant_ids,
    })
}

/// Estimate the impact of restoring `root_id`: the provenance-scoped set
/// (descendants cascaded by this exact root), not a fresh tree traversal.
/// `already_deleted` reports deleted descendants outside that scope —
/// they stay deleted even after the restore.
///
/// A cascaded-deleted root is rejected the same way the executor rejects
/// it, so the confirmation modal surfaces the "restore the cascade root
/// instead" guidance rather than a zero-impact estimate.
pub fn plan_restore(conn: &Connection, root_id: &Uuid) -> Result<CascadePlan, LifecycleError> {
    let root = get_entity(conn, root_id)?.ok_or(LifecycleError::NotFound(*root_id))?;
    if root.is_deleted && root.deletion_origin == DeletionOrigin::Cascaded {
        let hint = root
            .cascade_root_id
            .map(|id| format!("; restore its cascade root {id} instead"))
            .unwrap_or_default();
        return Err(LifecycleError::InvalidOperation(format!(
            "entity {root_id} was deleted by an ancestor's cascade{hint}"
        )));
    }

    let scoped = list_cascaded_from(conn, root_id)?;

    let mut per_kind_counts = PerKindCounts::default();
    let mut total_affected = 0u32;

    if root.is_deleted && root.deletion_origin == DeletionOrigin::Direct {
        per_kind_counts.bump(root.kind);
        total_affected += 1;
    }
    for entity in &scoped {
        per_kind_counts.bump(entity.kind);
        total_affected += 1;
    }

    let scoped_ids: Vec<Uuid> = scoped.iter().map(|e| e.id).collect();

    // Deleted descendants the restore will NOT touch (independently
    // deleted, or cascaded from a different root).
    let staying_deleted = crate::hierarchy::collect_subtree(conn, root_id)?
        .into_iter()
        .filter(|n| n.is_deleted && !scoped_ids.contains(&n.id))
        .count() as u32;

    Ok(CascadePlan {
        root_id: *root_id,
        per_kind_counts,
        total_affected,
        already_deleted: staying_deleted,
        descendant_ids: scoped_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_entity;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::EntityKind;
    use crate::models::Entity;

    fn seed(conn: &Connection) -> (Uuid, Uuid, Uuid, Uuid) {
        let org = Entity::new(EntityKind::Organization, "Org", None);
        insert_entity(conn, &org).unwrap();
        let branch = Entity::new(EntityKind::Branch, "Branch", Some(org.id));
        insert_entity(conn, &branch).unwrap();
        let doctor = Entity::new(EntityKind::Doctor, "Dr. Okafor", Some(branch.id));
        insert_entity(conn, &doctor).unwrap();
        let patient = Entity::new(EntityKind::Patient, "Pat", Some(branch.id));
        insert_entity(conn, &patient).unwrap();
        (org.id, branch.id, doctor.id, patient.id)
    }

    #[test]
    fn plan_counts_whole_live_subtree() {
        let conn = open_memory_database().unwrap();
        let (org_id, _, _, _) = seed(&conn);

        let plan = plan_delete(&conn, &org_id).unwrap();
        assert_eq!(plan.total_affected, 4);
        assert_eq!(plan.per_kind_counts.branches, 1);
        assert_eq!(plan.per_kind_counts.doctors, 1);
        assert_eq!(plan.per_kind_counts.patients, 1);
        assert_eq!(plan.already_deleted, 0);
        assert_eq!(plan.descendant_ids.len(), 3);
    }

    #[test]
    fn plan_is_idempotent_without_writes() {
        let conn = open_memory_database().unwrap();
        let (org_id, _, _, _) = seed(&conn);

        let a = plan_delete(&conn, &org_id).unwrap();
        let b = plan_delete(&conn, &org_id).unwrap();
        assert_eq!(a.per_kind_counts, b.per_kind_counts);
        assert_eq!(a.total_affected, b.total_affected);
        assert_eq!(a.descendant_ids, b.descendant_ids);
    }

    #[test]
    fn plan_missing_root_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = plan_delete(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[test]
    fn branch_root_is_counted_in_branches() {
        let conn = open_memory_database().unwrap();
        let (_, branch_id, _, _) = seed(&conn);

        let plan = plan_delete(&conn, &branch_id).unwrap();
        assert_eq!(plan.per_kind_counts.branches, 1);
        assert_eq!(plan.total_affected, 3);
    }

    #[test]
    fn traversal_stops_at_deleted_nodes_but_reports_them() {
        let conn = open_memory_database().unwrap();
        let (org_id, _, doctor_id, _) = seed(&conn);
        conn.execute(
            "UPDATE entities SET is_deleted = 1, deleted_at = datetime('now'),
             deleted_by = ?1, delete_reason = 'left practice', deletion_origin = 'direct'
             WHERE id = ?2",
            rusqlite::params![Uuid::new_v4().to_string(), doctor_id.to_string()],
        )
        .unwrap();

        let plan = plan_delete(&conn, &org_id).unwrap();
        assert_eq!(plan.total_affected, 3);
        assert_eq!(plan.per_kind_counts.doctors, 0);
        assert_eq!(plan.already_deleted, 1);
        // Boundary node still surfaces in the descendant set.
        assert!(plan.descendant_ids.contains(&doctor_id));
    }

    #[test]
    fn restore_plan_is_provenance_scoped() {
        let mut conn = open_memory_database().unwrap();
        let (_, branch_id, doctor_id, patient_id) = seed(&conn);
        let admin = Uuid::new_v4();

        crate::cascade::delete(&mut conn, &doctor_id, &admin, "left practice").unwrap();
        crate::cascade::delete(&mut conn, &branch_id, &admin, "closing").unwrap();

        let plan = plan_restore(&conn, &branch_id).unwrap();
        // Branch root plus its cascaded patient; the doctor was deleted
        // independently and stays deleted.
        assert_eq!(plan.total_affected, 2);
        assert_eq!(plan.per_kind_counts.branches, 1);
        assert_eq!(plan.per_kind_counts.patients, 1);
        assert_eq!(plan.per_kind_counts.doctors, 0);
        assert_eq!(plan.already_deleted, 1);
        assert!(plan.descendant_ids.contains(&patient_id));
    }

    #[test]
    fn restore_plan_of_cascaded_entity_names_the_cascade_root() {
        let mut conn = open_memory_database().unwrap();
        let (org_id, branch_id, _, _) = seed(&conn);
        let admin = Uuid::new_v4();

        crate::cascade::delete(&mut conn, &org_id, &admin, "org shutdown").unwrap();

        let err = plan_restore(&conn, &branch_id).unwrap_err();
        match err {
            LifecycleError::InvalidOperation(msg) => {
                assert!(msg.contains(&org_id.to_string()));
            }
            other => panic!("expected InvalidOperation, got {other:?}"),
        }
    }

    #[test]
    fn restore_plan_of_active_entity_is_empty() {
        let conn = open_memory_database().unwrap();
        let (org_id, _, _, _) = seed(&conn);

        let plan = plan_restore(&conn, &org_id).unwrap();
        assert_eq!(plan.total_affected, 0);
        assert!(plan.descendant_ids.is_empty());
    }

    #[test]
    fn plan_performs_no_writes() {
        let conn = open_memory_database().unwrap();
        let (org_id, branch_id, _, _) = seed(&conn);

        plan_delete(&conn, &org_id).unwrap();
        let branch = get_entity(&conn, &branch_id).unwrap().unwrap();
        assert!(!branch.is_deleted);
        assert_eq!(branch.version, 0);
    }
}
