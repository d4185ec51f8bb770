use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cascade::PerKindCounts;
use super::enums::{AuditAction, EntityKind};

/// One immutable entry in the cascade audit log.
///
/// Entries are append-only; the engine never updates or deletes them. The
/// live entity rows clear their delete metadata on restore, so this log is
/// where delete/restore history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Log row id; `None` before the entry is persisted.
    pub id: Option<i64>,
    pub action: AuditAction,
    pub root_id: Uuid,
    pub root_kind: EntityKind,
    pub actor_id: Uuid,
    pub reason: String,
    pub timestamp: NaiveDateTime,
    pub per_kind_counts: PerKindCounts,
    /// Entities transitioned by the cascade, root included.
    pub total_affected: u32,
}

/// Filter for `list_audit_events`; all fields optional.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub root_id: Option<Uuid>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}
