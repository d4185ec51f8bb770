//! Clinicore — hierarchical cascading soft-delete and restore engine.
//!
//! Governs how an Organization, its Branches, and their staff/patients
//! are deactivated, reactivated, and audited in a multi-tenant clinic
//! platform. Provenance (`deletion_origin` + `cascade_root_id`) is what
//! makes restore correct: a restore touches exactly the entities its
//! root's cascade deleted, never anything independently deleted.
//!
//! Auth, provisioning, and transport live outside this crate; it trusts
//! the caller's actor identity and authorization decision and only
//! records them.

pub mod cascade;
pub mod config;
pub mod db;
pub mod hierarchy;
pub mod models;
pub mod stats;

pub use cascade::{delete, plan_delete, plan_restore, restore, LifecycleError};
pub use db::repository::{check_lifecycle_consistency, list_audit_events};
pub use stats::{fetch_soft_delete_stats, SoftDeleteStats, StatsCache};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding binaries and tests. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
