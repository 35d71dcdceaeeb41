//! Locally handled agent faults.
//!
//! None of these are returned to callers. The controller logs them,
//! degrades to a safe default and reports them on the event queue.

use crate::state::AgentState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feature that depends on an injected collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Movement and patrol; needs a navigation proxy.
    Movement,
    /// Health, damage and death; needs a status container.
    Health,
}

/// A degraded-but-handled failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AgentFault {
    /// A required collaborator was missing at initialization.
    #[error("missing collaborator, {0:?} disabled")]
    ConfigurationError(Feature),

    /// `force_state` asked for a state that cannot be entered right now.
    #[error("cannot force {requested}, fell back to {resolved}")]
    InvalidTransitionRequest {
        /// State that was asked for.
        requested: AgentState,
        /// State actually entered.
        resolved: AgentState,
    },

    /// A target query ran without a live target.
    #[error("target query without a target")]
    OutOfRangeQuery,
}
