//! Host status container: health storage and status modifiers.
//!
//! The state machine never owns health. It reads and writes it through a
//! [`StatusContainer`] supplied by the host entity, and forwards modifier
//! calls to the same container.

use sentinel_common::ModifierId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Modifiers
// ============================================================================

/// Kind of status modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Cannot act; the behavior controller skips its update.
    Stunned,
    /// Movement speed multiplied by the modifier magnitude.
    Slowed,
    /// Movement speed multiplied by the modifier magnitude.
    Hasted,
    /// Host-defined modifier the controller does not interpret.
    Custom(u16),
}

impl ModifierKind {
    /// Whether this kind changes movement speed.
    #[must_use]
    pub const fn affects_speed(self) -> bool {
        matches!(self, Self::Slowed | Self::Hasted)
    }
}

/// One applied modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Instance ID.
    pub id: ModifierId,
    /// Modifier kind.
    pub kind: ModifierKind,
    /// Effect strength. Speed modifiers use it as a multiplier.
    pub magnitude: f32,
    /// Remaining duration, `None` for permanent.
    pub remaining: Option<f32>,
}

impl Modifier {
    /// Create a permanent modifier with magnitude 1.0.
    #[must_use]
    pub fn new(kind: ModifierKind) -> Self {
        Self {
            id: ModifierId::next(),
            kind,
            magnitude: 1.0,
            remaining: None,
        }
    }

    /// Set magnitude.
    #[must_use]
    pub fn with_magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Set duration.
    #[must_use]
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.remaining = Some(seconds.max(0.0));
        self
    }

    /// Check if expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining.is_some_and(|r| r <= 0.0)
    }
}

// ============================================================================
// Container interface
// ============================================================================

/// Status/buff container owned by the host entity.
pub trait StatusContainer: std::fmt::Debug {
    /// Current health.
    fn health(&self) -> i32;

    /// Maximum health.
    fn max_health(&self) -> i32;

    /// Overwrites current health. Implementations clamp to `0..=max`.
    fn set_health(&mut self, health: i32);

    /// Adds a modifier.
    fn add_modifier(&mut self, modifier: Modifier);

    /// Removes a modifier by instance ID. Returns whether it was present.
    fn remove_modifier(&mut self, id: ModifierId) -> bool;

    /// Whether any modifier of `kind` is active.
    fn has_modifier_of_type(&self, kind: ModifierKind) -> bool;

    /// Combined movement speed multiplier.
    fn speed_multiplier(&self) -> f32 {
        1.0
    }

    /// Advances modifier timers.
    fn tick(&mut self, _dt: f32) {}
}

// ============================================================================
// Default container
// ============================================================================

/// Health pool plus a list of timed modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSet {
    health: i32,
    max_health: i32,
    modifiers: Vec<Modifier>,
}

impl StatusSet {
    /// Create a full-health container.
    #[must_use]
    pub fn new(max_health: i32) -> Self {
        let max_health = max_health.max(0);
        Self {
            health: max_health,
            max_health,
            modifiers: Vec::new(),
        }
    }

    /// Active modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
}

impl StatusContainer for StatusSet {
    fn health(&self) -> i32 {
        self.health
    }

    fn max_health(&self) -> i32 {
        self.max_health
    }

    fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, self.max_health);
    }

    fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    fn remove_modifier(&mut self, id: ModifierId) -> bool {
        let len = self.modifiers.len();
        self.modifiers.retain(|m| m.id != id);
        self.modifiers.len() != len
    }

    fn has_modifier_of_type(&self, kind: ModifierKind) -> bool {
        self.modifiers.iter().any(|m| m.kind == kind)
    }

    fn speed_multiplier(&self) -> f32 {
        self.modifiers
            .iter()
            .filter(|m| m.kind.affects_speed())
            .map(|m| m.magnitude.max(0.0))
            .product()
    }

    fn tick(&mut self, dt: f32) {
        for modifier in &mut self.modifiers {
            if let Some(remaining) = modifier.remaining.as_mut() {
                *remaining -= dt;
            }
        }
        self.modifiers.retain(|m| !m.is_expired());
    }
}
