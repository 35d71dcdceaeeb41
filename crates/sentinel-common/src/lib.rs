//! # Sentinel Common
//!
//! Shared types for Project Sentinel:
//! - ID types (EntityId, ItemTypeId, ModifierId)
//! - Common error types
//! - Version constant
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

/// Crate version, shared by every Sentinel crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
