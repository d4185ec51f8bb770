use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EntityKind;

/// Typed per-kind impact counts over the fixed entity kinds.
///
/// Organizations are never counted here — a cascade has at most one
/// organization in it (the root), and it shows up in the totals instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKindCounts {
    pub branches: u32,
    pub doctors: u32,
    pub receptionists: u32,
    pub branch_admins: u32,
    pub patients: u32,
}

impl PerKindCounts {
    pub fn bump(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Organization => {}
            EntityKind::Branch => self.branches += 1,
            EntityKind::Doctor => self.doctors += 1,
            EntityKind::Receptionist => self.receptionists += 1,
            EntityKind::BranchAdmin => self.branch_admins += 1,
            EntityKind::Patient => self.patients += 1,
        }
    }

    pub fn sum(&self) -> u32 {
        self.branches + self.doctors + self.receptionists + self.branch_admins + self.patients
    }
}

/// Read-only impact estimate for a delete or restore, fed to the
/// confirmation screens before the user supplies a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadePlan {
    pub root_id: Uuid,
    /// Entities the operation would newly transition, by kind.
    pub per_kind_counts: PerKindCounts,
    /// Entities the operation would newly transition, root included.
    pub total_affected: u32,
    /// Descendants already in the operation's terminal state; reported so
    /// the impact screen reflects true subtree size, never re-stamped.
    pub already_deleted: u32,
    pub descendant_ids: Vec<Uuid>,
}

/// Outcome of a committed delete cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub root_id: Uuid,
    /// Entities transitioned to deleted by this call, root included.
    /// Zero when the root was already deleted (idempotent no-op).
    pub newly_deleted: u32,
    pub per_kind_counts: PerKindCounts,
    /// Set when the cascade committed but the audit write failed.
    /// The cascade is the source of truth; audit is best-effort.
    pub audit_warning: Option<String>,
}

/// Outcome of a committed restore cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub root_id: Uuid,
    /// Entities transitioned back to non-deleted, root included.
    pub newly_restored: u32,
    pub per_kind_counts: PerKindCounts,
    pub audit_warning: Option<String>,
}
