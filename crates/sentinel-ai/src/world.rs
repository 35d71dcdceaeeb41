//! World lookups the controller needs each tick.

use ahash::AHashMap;
use glam::Vec3;
use sentinel_common::EntityId;

use crate::combat::{Combatant, Dummy};
use crate::sensor::{LineOfSight, Occluders};

/// Registry view handed to an agent during its update.
///
/// Targets are handles; everything about them is looked up here, so an
/// entity that has been removed simply stops resolving.
pub trait AgentWorld {
    /// Position of an entity.
    fn position_of(&self, entity: EntityId) -> Option<Vec3>;

    /// Line-of-sight test used for detection.
    fn sight(&self) -> &dyn LineOfSight;

    /// Read access to an entity's combat contract.
    fn combatant(&self, entity: EntityId) -> Option<&dyn Combatant>;

    /// Write access to an entity's combat contract.
    fn combatant_mut(&mut self, entity: EntityId) -> Option<&mut dyn Combatant>;

    /// Position of a target that still exists and is alive.
    fn live_position(&self, entity: EntityId) -> Option<Vec3> {
        let position = self.position_of(entity)?;
        match self.combatant(entity) {
            Some(c) if c.is_dead() => None,
            _ => Some(position),
        }
    }
}

/// Mock world for testing.
#[derive(Debug, Default)]
pub struct MockWorld {
    positions: AHashMap<EntityId, Vec3>,
    bodies: AHashMap<EntityId, Dummy>,
    occluders: Occluders,
}

impl MockWorld {
    /// Creates an empty world with clear sight lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places (or moves) an entity.
    pub fn place(&mut self, entity: EntityId, position: Vec3) {
        self.positions.insert(entity, position);
    }

    /// Adds a damageable body.
    pub fn add_body(&mut self, entity: EntityId, body: Dummy, position: Vec3) {
        self.bodies.insert(entity, body);
        self.place(entity, position);
    }

    /// Removes an entity entirely.
    pub fn remove(&mut self, entity: EntityId) {
        self.positions.remove(&entity);
        self.bodies.remove(&entity);
    }

    /// A body added with [`add_body`](Self::add_body).
    #[must_use]
    pub fn body(&self, entity: EntityId) -> Option<&Dummy> {
        self.bodies.get(&entity)
    }

    /// Adds a spherical sight blocker.
    pub fn block_sight(&mut self, center: Vec3, radius: f32) {
        self.occluders = std::mem::take(&mut self.occluders).with(center, radius);
    }
}

impl AgentWorld for MockWorld {
    fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }

    fn sight(&self) -> &dyn LineOfSight {
        &self.occluders
    }

    fn combatant(&self, entity: EntityId) -> Option<&dyn Combatant> {
        let body = self.bodies.get(&entity)?;
        Some(body)
    }

    fn combatant_mut(&mut self, entity: EntityId) -> Option<&mut dyn Combatant> {
        let body = self.bodies.get_mut(&entity)?;
        Some(body)
    }
}
