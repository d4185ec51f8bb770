use rusqlite::Connection;

use crate::db::DatabaseError;

/// A single lifecycle-invariant violation detected by the checker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyIssue {
    pub category: String,
    pub description: String,
    pub entity_id: String,
}

/// Result of a lifecycle consistency scan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub entities_checked: i64,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Scan the entity store for lifecycle-invariant violations.
///
/// Detects:
/// - Deleted entities missing delete metadata or provenance
/// - Non-deleted entities carrying stale delete metadata or provenance
/// - Cascaded entities without a cascade_root_id (and vice versa)
/// - Non-deleted entities under a deleted parent
pub fn check_lifecycle_consistency(conn: &Connection) -> Result<ConsistencyReport, DatabaseError> {
    let mut issues = Vec::new();

    let entities_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;

    collect(
        conn,
        &mut issues,
        "deleted_missing_metadata",
        "Deleted entity missing deleted_at/deleted_by/delete_reason or provenance",
        "SELECT id FROM entities WHERE is_deleted = 1
         AND (deleted_at IS NULL OR deleted_by IS NULL OR delete_reason IS NULL
              OR deletion_origin = 'none')",
    )?;

    collect(
        conn,
        &mut issues,
        "stale_delete_metadata",
        "Non-deleted entity carrying delete metadata or provenance",
        "SELECT id FROM entities WHERE is_deleted = 0
         AND (deleted_at IS NOT NULL OR deletion_origin != 'none'
              OR cascade_root_id IS NOT NULL)",
    )?;

    collect(
        conn,
        &mut issues,
        "provenance_mismatch",
        "cascade_root_id set without cascaded origin, or cascaded origin without root",
        "SELECT id FROM entities
         WHERE (deletion_origin = 'cascaded' AND cascade_root_id IS NULL)
            OR (deletion_origin != 'cascaded' AND cascade_root_id IS NOT NULL)",
    )?;

    collect(
        conn,
        &mut issues,
        "live_child_of_deleted_parent",
        "Non-deleted entity whose parent is deleted",
        "SELECT c.id FROM entities c
         JOIN entities p ON c.parent_id = p.id
         WHERE c.is_deleted = 0 AND p.is_deleted = 1",
    )?;

    Ok(ConsistencyReport {
        issues,
        entities_checked,
    })
}

fn collect(
    conn: &Connection,
    issues: &mut Vec<ConsistencyIssue>,
    category: &str,
    description: &str,
    sql: &str,
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let ids: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .collect();

    for id in ids {
        issues.push(ConsistencyIssue {
            category: category.into(),
            description: description.into(),
            entity_id: id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::entity::insert_entity;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::EntityKind;
    use crate::models::Entity;
    use rusqlite::params;

    #[test]
    fn healthy_store_is_clean() {
        let conn = open_memory_database().unwrap();
        let org = Entity::new(EntityKind::Organization, "Org", None);
        insert_entity(&conn, &org).unwrap();
        let branch = Entity::new(EntityKind::Branch, "Branch", Some(org.id));
        insert_entity(&conn, &branch).unwrap();

        let report = check_lifecycle_consistency(&conn).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.entities_checked, 2);
    }

    #[test]
    fn detects_deleted_entity_missing_metadata() {
        let conn = open_memory_database().unwrap();
        let org = Entity::new(EntityKind::Organization, "Org", None);
        insert_entity(&conn, &org).unwrap();
        conn.execute(
            "UPDATE entities SET is_deleted = 1 WHERE id = ?1",
            params![org.id.to_string()],
        )
        .unwrap();

        let report = check_lifecycle_consistency(&conn).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.category == "deleted_missing_metadata"));
    }

    #[test]
    fn detects_live_child_of_deleted_parent() {
        let conn = open_memory_database().unwrap();
        let org = Entity::new(EntityKind::Organization, "Org", None);
        insert_entity(&conn, &org).unwrap();
        let branch = Entity::new(EntityKind::Branch, "Branch", Some(org.id));
        insert_entity(&conn, &branch).unwrap();
        conn.execute(
            "UPDATE entities SET is_deleted = 1, deleted_at = datetime('now'),
             deleted_by = 'a', delete_reason = 'r', deletion_origin = 'direct'
             WHERE id = ?1",
            params![org.id.to_string()],
        )
        .unwrap();

        let report = check_lifecycle_consistency(&conn).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.category == "live_child_of_deleted_parent"
                && i.entity_id == branch.id.to_string()));
    }
}
