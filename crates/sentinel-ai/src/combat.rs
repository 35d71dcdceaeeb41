//! Combat contract shared by everything that can be hit.
//!
//! Agents consume this trait to push damage into a target and implement it
//! themselves so other entities can attack them.

use serde::{Deserialize, Serialize};

/// Damage dealt by one resolved attack unless configured otherwise.
pub const DEFAULT_ATTACK_DAMAGE: i32 = 10;

/// Capability interface for a damageable entity.
pub trait Combatant {
    /// Applies damage. Implementations clamp health at zero.
    fn take_damage(&mut self, amount: i32);

    /// Current health, never negative.
    fn current_health(&self) -> i32;

    /// Maximum health.
    fn max_health(&self) -> i32;

    /// Whether the entity is dead.
    fn is_dead(&self) -> bool {
        self.current_health() <= 0
    }
}

/// Subtracts `amount` from `health`, clamping at zero.
///
/// Negative amounts are treated as zero; healing goes through other paths.
#[must_use]
pub fn apply_damage(health: i32, amount: i32) -> i32 {
    health.saturating_sub(amount.max(0)).max(0)
}

/// A plain damageable body with no behavior of its own.
///
/// Hosts use it for player avatars, destructible props or training targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dummy {
    health: i32,
    max_health: i32,
    /// Total damage received over the body's lifetime.
    pub damage_taken: i64,
    /// Number of `take_damage` calls received.
    pub hits_taken: u32,
}

impl Dummy {
    /// Creates a body at full health.
    #[must_use]
    pub fn new(max_health: i32) -> Self {
        let max_health = max_health.max(0);
        Self {
            health: max_health,
            max_health,
            damage_taken: 0,
            hits_taken: 0,
        }
    }

    /// Restores health to maximum.
    pub fn heal_full(&mut self) {
        self.health = self.max_health;
    }
}

impl Combatant for Dummy {
    fn take_damage(&mut self, amount: i32) {
        if self.is_dead() {
            return;
        }
        self.hits_taken += 1;
        self.damage_taken += i64::from(amount.max(0));
        self.health = apply_damage(self.health, amount);
    }

    fn current_health(&self) -> i32 {
        self.health
    }

    fn max_health(&self) -> i32 {
        self.max_health
    }
}
