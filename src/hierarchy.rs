//! Hierarchy index — parent-pointer traversal over the entity tree.
//!
//! "Direct children of X" is a single indexed lookup on `parent_id`;
//! subtree collection is breadth-first repeated lookups, which bounds
//! memory for wide trees and needs no materialized path or closure table.

use std::collections::VecDeque;
use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::EntityKind;

/// Lightweight projection of one entity for traversal: just what the
/// planner and executor need, not the full record.
#[derive(Debug, Clone)]
pub struct SubtreeNode {
    pub id: Uuid,
    pub kind: EntityKind,
    pub is_deleted: bool,
    pub version: i64,
}

/// Direct children of the given entity, as traversal nodes.
pub fn child_nodes(conn: &Connection, parent_id: &Uuid) -> Result<Vec<SubtreeNode>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, is_deleted, version FROM entities WHERE parent_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![parent_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, kind, is_deleted, version)| {
            Ok(SubtreeNode {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                kind: EntityKind::from_str(&kind)?,
                is_deleted: is_deleted != 0,
                version,
            })
        })
        .collect()
}

/// Every descendant of `root_id` (root excluded), breadth-first.
pub fn collect_subtree(conn: &Connection, root_id: &Uuid) -> Result<Vec<SubtreeNode>, DatabaseError> {
    let mut descendants = Vec::new();
    let mut queue = VecDeque::from([*root_id]);

    while let Some(id) = queue.pop_front() {
        for child in child_nodes(conn, &id)? {
            queue.push_back(child.id);
            descendants.push(child);
        }
    }
    Ok(descendants)
}
