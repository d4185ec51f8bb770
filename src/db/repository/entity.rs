use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::TS_FORMAT;
use crate::db::DatabaseError;
use crate::models::enums::{DeletionOrigin, EntityKind};
use crate::models::Entity;

const ENTITY_COLUMNS: &str = "id, kind, name, parent_id, is_active, is_deleted, deleted_at,
     deleted_by, delete_reason, deletion_origin, cascade_root_id, version, created_at";

/// Insert a new entity, validating its kind/parent pairing against the
/// clinic hierarchy (organization → branch → staff/patients).
pub fn insert_entity(conn: &Connection, entity: &Entity) -> Result<(), DatabaseError> {
    match (entity.kind.parent_kind(), entity.parent_id) {
        (None, Some(_)) => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "{} must not have a parent",
                entity.kind.as_str()
            )))
        }
        (Some(expected), Some(parent_id)) => {
            let parent = get_entity(conn, &parent_id)?.ok_or(DatabaseError::NotFound {
                entity_type: expected.as_str().into(),
                id: parent_id.to_string(),
            })?;
            if parent.kind != expected {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "{} must be parented under a {}, got {}",
                    entity.kind.as_str(),
                    expected.as_str(),
                    parent.kind.as_str()
                )));
            }
        }
        (Some(expected), None) => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "{} requires a {} parent",
                entity.kind.as_str(),
                expected.as_str()
            )))
        }
        (None, None) => {}
    }

    conn.execute(
        "INSERT INTO entities (id, kind, name, parent_id, is_active, is_deleted, deleted_at,
         deleted_by, delete_reason, deletion_origin, cascade_root_id, version, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            entity.id.to_string(),
            entity.kind.as_str(),
            entity.name,
            entity.parent_id.map(|id| id.to_string()),
            entity.is_active as i32,
            entity.is_deleted as i32,
            entity.deleted_at.map(|t| t.format(TS_FORMAT).to_string()),
            entity.deleted_by.map(|id| id.to_string()),
            entity.delete_reason,
            entity.deletion_origin.as_str(),
            entity.cascade_root_id.map(|id| id.to_string()),
            entity.version,
            entity.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_entity(conn: &Connection, id: &Uuid) -> Result<Option<Entity>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], entity_row);

    match result {
        Ok(row) => Ok(Some(entity_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Entities deleted by the cascade rooted at `root_id` — the
/// provenance-scoped set a restore of that root may touch.
pub fn list_cascaded_from(conn: &Connection, root_id: &Uuid) -> Result<Vec<Entity>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entities
         WHERE cascade_root_id = ?1 AND deletion_origin = 'cascaded' AND is_deleted = 1"
    ))?;

    let rows = stmt
        .query_map(params![root_id.to_string()], entity_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(entity_from_row).collect()
}

// Internal row type for Entity mapping
struct EntityRow {
    id: String,
    kind: String,
    name: String,
    parent_id: Option<String>,
    is_active: i32,
    is_deleted: i32,
    deleted_at: Option<String>,
    deleted_by: Option<String>,
    delete_reason: Option<String>,
    deletion_origin: String,
    cascade_root_id: Option<String>,
    version: i64,
    created_at: String,
}

fn entity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRow> {
    Ok(EntityRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        is_active: row.get(4)?,
        is_deleted: row.get(5)?,
        deleted_at: row.get(6)?,
        deleted_by: row.get(7)?,
        delete_reason: row.get(8)?,
        deletion_origin: row.get(9)?,
        cascade_root_id: row.get(10)?,
        version: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn entity_from_row(row: EntityRow) -> Result<Entity, DatabaseError> {
    Ok(Entity {
        id: parse_uuid(&row.id)?,
        kind: EntityKind::from_str(&row.kind)?,
        name: row.name,
        parent_id: row.parent_id.as_deref().map(parse_uuid).transpose()?,
        is_active: row.is_active != 0,
        is_deleted: row.is_deleted != 0,
        deleted_at: row
            .deleted_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, TS_FORMAT).ok()),
        deleted_by: row.deleted_by.as_deref().map(parse_uuid).transpose()?,
        delete_reason: row.delete_reason,
        deletion_origin: DeletionOrigin::from_str(&row.deletion_origin)?,
        cascade_root_id: row.cascade_root_id.as_deref().map(parse_uuid).transpose()?,
        version: row.version,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, TS_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%dT%H:%M:%S"))
            .unwrap_or_default(),
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
