//! # Sentinel AI
//!
//! Behavior controllers for autonomous combat agents.
//!
//! This crate provides:
//! - The behavior state machine (idle, patrol, approach, attack, wait, dead)
//! - Sensing with detection radius and line of sight
//! - Patrol routes and the navigation proxy seam
//! - Combat contract, status modifiers and loot tables
//! - Outbound events and the bus hosts drain after each tick
//! - A registry that owns agents and drives them with a fixed clock

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod combat;
pub mod config;
pub mod controller;
pub mod events;
pub mod fault;
pub mod loot;
pub mod navigation;
pub mod patrol;
pub mod registry;
pub mod sensor;
pub mod state;
pub mod status;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::controller::*;
    pub use crate::events::*;
    pub use crate::fault::*;
    pub use crate::loot::*;
    pub use crate::navigation::*;
    pub use crate::patrol::*;
    pub use crate::registry::*;
    pub use crate::sensor::*;
    pub use crate::state::*;
    pub use crate::status::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use sentinel_common::{EntityId, ItemTypeId};

    #[test]
    fn test_guard_encounter_from_toml() {
        let file = ArchetypeFile::from_toml_str(
            r#"
            [[agents]]
            name = "guard"
            spawn = [6.0, 0.0, 0.0]
            max_health = 30

            [[agents.loot]]
            item = 5
            chance = 1.0
            "#,
        )
        .expect("archetypes");

        let mut registry = AgentRegistry::default();
        let player = EntityId::new();
        registry
            .add_combatant(player, Dummy::new(500), Vec3::ZERO)
            .expect("player");

        let archetype = &file.agents[0];
        let guard = AgentController::builder(EntityId::new(), archetype.config.clone())
            .navigator(StraightLineNavigator::new(
                archetype.spawn,
                archetype.config.move_speed,
            ))
            .target(player)
            .seed(3)
            .build();
        let guard_id = guard.id();
        registry.spawn(guard, archetype.spawn).expect("spawn");

        for _ in 0..120 {
            registry.tick(1.0 / 60.0);
        }
        registry.damage(guard_id, 30).expect("damage");

        let events = registry.drain_events();
        assert!(events.contains(&AgentEvent::TargetDetected {
            agent: guard_id,
            target: player,
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::LootDropped { item, .. } if *item == ItemTypeId::new(5)
        )));
        assert!(events.contains(&AgentEvent::Death { agent: guard_id }));
    }
}
