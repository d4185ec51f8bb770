//! Repository layer — entity-scoped database operations.
//!
//! Free functions over `&Connection`, one sub-module per concern.
//! All public functions are re-exported here.

mod audit;
mod consistency;
mod entity;

pub use audit::*;
pub use consistency::*;
pub use entity::*;

/// Timestamp text format used across all tables.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
