//! Error types for Project Sentinel.

use crate::ids::EntityId;
use thiserror::Error;

/// Top-level error type for Sentinel operations.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// No entity with this handle is registered
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// An entity with this handle is already registered
    #[error("Entity already registered: {0}")]
    DuplicateEntity(EntityId),

    /// Agent or scenario configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sentinel operations.
pub type SentinelResult<T> = Result<T, SentinelError>;
