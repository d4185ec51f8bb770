//! Cascade planner and executor — the delete/restore lifecycle engine.
//!
//! The planner is a pure read path feeding impact-confirmation screens;
//! the executor re-runs the traversal inside a transaction, stamps
//! provenance, and records the audit trail.

pub mod executor;
pub mod planner;

pub use executor::{delete, restore};
pub use planner::{plan_delete, plan_restore};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

/// Lifecycle-operation failure taxonomy.
///
/// `Validation` and `InvalidOperation` are caller-correctable;
/// `Conflict` means re-plan and retry; `Storage` is fatal and the
/// cascade rolled back whole.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Concurrent cascade touched entity {0}; fetch a fresh plan and retry")]
    Conflict(Uuid),

    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(DatabaseError::Sqlite(e))
    }
}
