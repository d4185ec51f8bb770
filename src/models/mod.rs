//! Domain model types shared across the engine.

pub mod audit;
pub mod cascade;
pub mod entity;
pub mod enums;

pub use audit::*;
pub use cascade::*;
pub use entity::*;
pub use enums::*;
