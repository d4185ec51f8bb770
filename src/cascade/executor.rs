//! Cascade execution: provenance-stamped soft delete and restore with
//! per-subtree atomicity.
//!
//! Each call re-runs the authoritative traversal inside an IMMEDIATE
//! transaction (a prior plan may be stale) and guards every lifecycle
//! UPDATE with an optimistic version check. A zero-row update means a
//! concurrent overlapping cascade won; the whole transaction rolls back
//! and the caller gets `Conflict`. Disjoint subtrees never contend past
//! the storage layer's own write serialization.

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use uuid::Uuid;

use super::planner::traverse_for_delete;
use super::LifecycleError;
use crate::db::repository::{get_entity, list_cascaded_from, record_audit_event, TS_FORMAT};
use crate::models::enums::{AuditAction, DeletionOrigin, EntityKind};
use crate::models::{AuditEvent, DeleteResult, PerKindCounts, RestoreResult};

/// Soft-delete `root_id` and cascade to every not-yet-deleted descendant.
///
/// The root is stamped `direct`; cascaded descendants inherit the root's
/// reason, actor and timestamp and point back at the root via
/// `cascade_root_id`. Descendants already deleted (any origin) are never
/// re-stamped, so a later restore of this root cannot resurrect them.
///
/// Deleting an already-deleted root is an idempotent no-op: UI retries
/// must be safe, so it returns success with zero newly-affected entities.
pub fn delete(
    conn: &mut Connection,
    root_id: &Uuid,
    actor_id: &Uuid,
    reason: &str,
) -> Result<DeleteResult, LifecycleError> {
    let reason = validated_reason(reason)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let root = get_entity(&tx, root_id)?.ok_or(LifecycleError::NotFound(*root_id))?;

    if root.is_deleted {
        tracing::debug!(root = %root_id, "delete no-op: root already deleted");
        return Ok(DeleteResult {
            root_id: *root_id,
            newly_deleted: 0,
            per_kind_counts: PerKindCounts::default(),
            audit_warning: None,
        });
    }

    let traversal = traverse_for_delete(&tx, root_id)?;
    let now = Utc::now().naive_utc();
    let stamp = now.format(TS_FORMAT).to_string();

    let mut per_kind_counts = PerKindCounts::default();
    stamp_deleted(
        &tx,
        root_id,
        root.version,
        DeletionOrigin::Direct,
        None,
        &stamp,
        actor_id,
        &reason,
    )?;
    per_kind_counts.bump(root.kind);

    for node in &traversal.live {
        stamp_deleted(
            &tx,
            &node.id,
            node.version,
            DeletionOrigin::Cascaded,
            Some(root_id),
            &stamp,
            actor_id,
            &reason,
        )?;
        per_kind_counts.bump(node.kind);
    }

    let newly_deleted = traversal.live.len() as u32 + 1;
    tx.commit()?;
    tracing::info!(root = %root_id, affected = newly_deleted, "delete cascade committed");

    let audit_warning = write_audit(
        conn,
        AuditAction::Delete,
        root_id,
        root.kind,
        actor_id,
        &reason,
        now,
        per_kind_counts,
        newly_deleted,
    );

    Ok(DeleteResult {
        root_id: *root_id,
        newly_deleted,
        per_kind_counts,
        audit_warning,
    })
}

/// Restore `root_id` and exactly the descendants its own cascade deleted.
///
/// Only a directly-deleted entity may be restored; a cascaded entity's
/// lifecycle belongs to its cascade root. The restore set is provenance
/// scoped (`cascade_root_id = root`), never a fresh tree traversal, so
/// independently deleted descendants stay deleted.
///
/// A root whose parent is still deleted cannot be restored — that would
/// leave a live entity under a deleted ancestor. The ancestor must be
/// restored first.
pub fn restore(
    conn: &mut Connection,
    root_id: &Uuid,
    actor_id: &Uuid,
    reason: &str,
) -> Result<RestoreResult, LifecycleError> {
    let reason = validated_reason(reason)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let root = get_entity(&tx, root_id)?.ok_or(LifecycleError::NotFound(*root_id))?;

    if !root.is_deleted {
        return Err(LifecycleError::InvalidOperation(format!(
            "entity {root_id} is not deleted"
        )));
    }
    match root.deletion_origin {
        DeletionOrigin::Direct => {}
        DeletionOrigin::Cascaded => {
            let hint = root
                .cascade_root_id
                .map(|id| format!("; restore its cascade root {id} instead"))
                .unwrap_or_default();
            return Err(LifecycleError::InvalidOperation(format!(
                "entity {root_id} was deleted by an ancestor's cascade{hint}"
            )));
        }
        DeletionOrigin::None => {
            return Err(LifecycleError::InvalidOperation(format!(
                "entity {root_id} is deleted but carries no deletion provenance"
            )));
        }
    }

    // No entity may be non-deleted while its parent is deleted, so a
    // restore under a deleted ancestor is refused outright.
    if let Some(parent_id) = root.parent_id {
        let parent = get_entity(&tx, &parent_id)?.ok_or(LifecycleError::NotFound(parent_id))?;
        if parent.is_deleted {
            return Err(LifecycleError::InvalidOperation(format!(
                "entity {root_id} cannot be restored while its parent {parent_id} is deleted; restore the ancestor first"
            )));
        }
    }

    let scoped = list_cascaded_from(&tx, root_id)?;
    let now = Utc::now().naive_utc();

    let mut per_kind_counts = PerKindCounts::default();
    clear_deleted(&tx, root_id, root.version)?;
    per_kind_counts.bump(root.kind);

    for entity in &scoped {
        clear_deleted(&tx, &entity.id, entity.version)?;
        per_kind_counts.bump(entity.kind);
    }

    let newly_restored = scoped.len() as u32 + 1;
    tx.commit()?;
    tracing::info!(root = %root_id, affected = newly_restored, "restore cascade committed");

    let audit_warning = write_audit(
        conn,
        AuditAction::Restore,
        root_id,
        root.kind,
        actor_id,
        &reason,
        now,
        per_kind_counts,
        newly_restored,
    );

    Ok(RestoreResult {
        root_id: *root_id,
        newly_restored,
        per_kind_counts,
        audit_warning,
    })
}

fn validated_reason(reason: &str) -> Result<String, LifecycleError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::Validation(
            "reason must not be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

#[allow(clippy::too_many_arguments)]
fn stamp_deleted(
    conn: &Connection,
    id: &Uuid,
    expected_version: i64,
    origin: DeletionOrigin,
    cascade_root_id: Option<&Uuid>,
    deleted_at: &str,
    deleted_by: &Uuid,
    reason: &str,
) -> Result<(), LifecycleError> {
    let rows = conn.execute(
        "UPDATE entities
         SET is_deleted = 1, deletion_origin = ?1, cascade_root_id = ?2,
             deleted_at = ?3, deleted_by = ?4, delete_reason = ?5,
             version = version + 1
         WHERE id = ?6 AND version = ?7 AND is_deleted = 0",
        params![
            origin.as_str(),
            cascade_root_id.map(|r| r.to_string()),
            deleted_at,
            deleted_by.to_string(),
            reason,
            id.to_string(),
            expected_version,
        ],
    )?;
    if rows == 0 {
        return Err(LifecycleError::Conflict(*id));
    }
    Ok(())
}

/// Back to non-deleted: live delete metadata is cleared; history stays
/// in the audit log.
fn clear_deleted(
    conn: &Connection,
    id: &Uuid,
    expected_version: i64,
) -> Result<(), LifecycleError> {
    let rows = conn.execute(
        "UPDATE entities
         SET is_deleted = 0, deletion_origin = 'none', cascade_root_id = NULL,
             deleted_at = NULL, deleted_by = NULL, delete_reason = NULL,
             version = version + 1
         WHERE id = ?1 AND version = ?2 AND is_deleted = 1",
        params![id.to_string(), expected_version],
    )?;
    if rows == 0 {
        return Err(LifecycleError::Conflict(*id));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_audit(
    conn: &Connection,
    action: AuditAction,
    root_id: &Uuid,
    root_kind: EntityKind,
    actor_id: &Uuid,
    reason: &str,
    timestamp: NaiveDateTime,
    per_kind_counts: PerKindCounts,
    total_affected: u32,
) -> Option<String> {
    let event = AuditEvent {
        id: None,
        action,
        root_id: *root_id,
        root_kind,
        actor_id: *actor_id,
        reason: reason.to_string(),
        timestamp,
        per_kind_counts,
        total_affected,
    };
    match record_audit_event(conn, &event) {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(root = %root_id, error = %e, "cascade committed but audit write failed");
            Some(format!("cascade committed but audit write failed: {e}"))
        }
    }
}
