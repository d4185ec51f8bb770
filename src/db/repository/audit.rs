use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::TS_FORMAT;
use crate::db::DatabaseError;
use crate::models::enums::{AuditAction, EntityKind};
use crate::models::{AuditEvent, AuditFilter, PerKindCounts};

/// Append one cascade event to the audit log. Entries are never updated
/// or deleted afterwards.
pub fn record_audit_event(conn: &Connection, event: &AuditEvent) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (action, root_id, root_kind, actor_id, reason, timestamp,
         branches, doctors, receptionists, branch_admins, patients, total_affected)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            event.action.as_str(),
            event.root_id.to_string(),
            event.root_kind.as_str(),
            event.actor_id.to_string(),
            event.reason,
            event.timestamp.format(TS_FORMAT).to_string(),
            event.per_kind_counts.branches,
            event.per_kind_counts.doctors,
            event.per_kind_counts.receptionists,
            event.per_kind_counts.branch_admins,
            event.per_kind_counts.patients,
            event.total_affected,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Query audit entries, newest first, optionally scoped to one cascade
/// root and/or a timestamp range.
pub fn list_audit_events(
    conn: &Connection,
    filter: &AuditFilter,
) -> Result<Vec<AuditEvent>, DatabaseError> {
    let mut sql = String::from(
        "SELECT id, action, root_id, root_kind, actor_id, reason, timestamp,
         branches, doctors, receptionists, branch_admins, patients, total_affected
         FROM audit_log WHERE 1=1",
    );
    let mut args: Vec<String> = Vec::new();

    if let Some(root_id) = filter.root_id {
        args.push(root_id.to_string());
        sql.push_str(&format!(" AND root_id = ?{}", args.len()));
    }
    if let Some(from) = filter.from {
        args.push(from.format(TS_FORMAT).to_string());
        sql.push_str(&format!(" AND timestamp >= ?{}", args.len()));
    }
    if let Some(to) = filter.to {
        args.push(to.format(TS_FORMAT).to_string());
        sql.push_str(&format!(" AND timestamp <= ?{}", args.len()));
    }
    sql.push_str(" ORDER BY timestamp DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |row| {
            Ok(AuditRow {
                id: row.get(0)?,
                action: row.get(1)?,
                root_id: row.get(2)?,
                root_kind: row.get(3)?,
                actor_id: row.get(4)?,
                reason: row.get(5)?,
                timestamp: row.get(6)?,
                branches: row.get(7)?,
                doctors: row.get(8)?,
                receptionists: row.get(9)?,
                branch_admins: row.get(10)?,
                patients: row.get(11)?,
                total_affected: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(audit_from_row).collect()
}

struct AuditRow {
    id: i64,
    action: String,
    root_id: String,
    root_kind: String,
    actor_id: String,
    reason: String,
    timestamp: String,
    branches: u32,
    doctors: u32,
    receptionists: u32,
    branch_admins: u32,
    patients: u32,
    total_affected: u32,
}

fn audit_from_row(row: AuditRow) -> Result<AuditEvent, DatabaseError> {
    Ok(AuditEvent {
        id: Some(row.id),
        action: AuditAction::from_str(&row.action)?,
        root_id: Uuid::parse_str(&row.root_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        root_kind: EntityKind::from_str(&row.root_kind)?,
        actor_id: Uuid::parse_str(&row.actor_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        reason: row.reason,
        timestamp: NaiveDateTime::parse_from_str(&row.timestamp, TS_FORMAT).unwrap_or_default(),
        per_kind_counts: PerKindCounts {
            branches: row.branches,
            doctors: row.doctors,
            receptionists: row.receptionists,
            branch_admins: row.branch_admins,
            patients: row.patients,
        },
        total_affected: row.total_affected,
    })
}
