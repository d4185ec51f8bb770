use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DeletionOrigin, EntityKind};

/// One record in the clinic hierarchy: organization, branch, staff or patient.
///
/// The deletion-state fields are owned by the cascade engine; `is_active` is
/// a provisioning flag the engine reads but never writes (an organization can
/// be inactive-but-not-deleted while awaiting admin assignment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub kind: EntityKind,
    pub name: String,
    /// Owning entity one level up; `None` only for organizations.
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub deleted_by: Option<Uuid>,
    pub delete_reason: Option<String>,
    /// Provenance: was this entity the direct target of a delete, or swept
    /// in by an ancestor's cascade? Drives what a restore may touch.
    pub deletion_origin: DeletionOrigin,
    /// When `deletion_origin = Cascaded`, the direct-deletion root whose
    /// cascade produced this state. Stable until restore.
    pub cascade_root_id: Option<Uuid>,
    /// Optimistic-concurrency counter, bumped on every lifecycle write.
    pub version: i64,
    pub created_at: NaiveDateTime,
}

impl Entity {
    /// A new active, non-deleted entity as the provisioning flow creates it.
    pub fn new(kind: EntityKind, name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            parent_id,
            is_active: true,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            delete_reason: None,
            deletion_origin: DeletionOrigin::None,
            cascade_root_id: None,
            version: 0,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Deletion implies inactive regardless of the `is_active` flag.
    pub fn is_effectively_active(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}
