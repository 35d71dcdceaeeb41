//! Entity registry that owns agents, plain bodies and positions.
//!
//! The registry is the host-side half of the tick: it moves agents along
//! their navigators, updates each one against itself as the world, then
//! forwards every agent's events to the [`EventBus`].

use std::fmt;

use ahash::AHashMap;
use glam::Vec3;
use sentinel_common::{EntityId, SentinelError, SentinelResult};
use tracing::{debug, info, warn};

use crate::combat::Combatant;
use crate::controller::AgentController;
use crate::events::{AgentEvent, EventBus, EventHandler};
use crate::sensor::{LineOfSight, OpenField};
use crate::world::AgentWorld;

/// Owns every simulated entity and drives them with a shared clock.
pub struct AgentRegistry {
    agents: AHashMap<EntityId, AgentController>,
    bodies: AHashMap<EntityId, Box<dyn Combatant>>,
    positions: AHashMap<EntityId, Vec3>,
    sight: Box<dyn LineOfSight>,
    bus: EventBus,
    clock: f32,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.len())
            .field("bodies", &self.bodies.len())
            .field("sight", &self.sight)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(OpenField)
    }
}

impl AgentRegistry {
    /// Creates an empty registry using `sight` for line-of-sight tests.
    #[must_use]
    pub fn new(sight: impl LineOfSight + 'static) -> Self {
        Self {
            agents: AHashMap::new(),
            bodies: AHashMap::new(),
            positions: AHashMap::new(),
            sight: Box::new(sight),
            bus: EventBus::default(),
            clock: 0.0,
        }
    }

    /// Replaces the event bus with one of the given capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.bus = EventBus::new(capacity);
        self
    }

    fn ensure_free(&self, id: EntityId) -> SentinelResult<()> {
        if self.agents.contains_key(&id) || self.bodies.contains_key(&id) {
            return Err(SentinelError::DuplicateEntity(id));
        }
        Ok(())
    }

    /// Adds an agent at `position`.
    pub fn spawn(&mut self, agent: AgentController, position: Vec3) -> SentinelResult<()> {
        let id = agent.id();
        self.ensure_free(id)?;
        self.positions.insert(id, position);
        self.agents.insert(id, agent);
        info!("Spawned agent {id} at {position:?}");
        Ok(())
    }

    /// Adds a damageable body with no behavior.
    pub fn add_combatant(
        &mut self,
        id: EntityId,
        body: impl Combatant + 'static,
        position: Vec3,
    ) -> SentinelResult<()> {
        self.ensure_free(id)?;
        self.positions.insert(id, position);
        self.bodies.insert(id, Box::new(body));
        Ok(())
    }

    /// Removes an agent or body right away.
    pub fn despawn(&mut self, id: EntityId) -> SentinelResult<()> {
        let known = self.agents.remove(&id).is_some() | self.bodies.remove(&id).is_some();
        if !known {
            return Err(SentinelError::UnknownEntity(id));
        }
        self.positions.remove(&id);
        debug!("Despawned {id}");
        Ok(())
    }

    /// Moves an entity.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> SentinelResult<()> {
        let slot = self
            .positions
            .get_mut(&id)
            .ok_or(SentinelError::UnknownEntity(id))?;
        *slot = position;
        Ok(())
    }

    /// Position of an entity.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.positions.get(&id).copied()
    }

    /// Deals damage through an entity's combat contract.
    pub fn damage(&mut self, id: EntityId, amount: i32) -> SentinelResult<()> {
        let target = self
            .combatant_mut(id)
            .ok_or(SentinelError::UnknownEntity(id))?;
        target.take_damage(amount);
        Ok(())
    }

    /// An agent.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&AgentController> {
        self.agents.get(&id)
    }

    /// An agent, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut AgentController> {
        self.agents.get_mut(&id)
    }

    /// Agent IDs in ascending order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.agents.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether there are no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Simulation time.
    #[must_use]
    pub const fn now(&self) -> f32 {
        self.clock
    }

    /// The event bus.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Advances every agent by `dt` seconds.
    ///
    /// Agents are visited in ascending ID order so runs are reproducible.
    pub fn tick(&mut self, dt: f32) {
        self.clock += dt;
        let now = self.clock;
        let ids = self.agent_ids();

        for id in &ids {
            let Some(agent) = self.agents.get_mut(id) else {
                continue;
            };
            let from = self.positions.get(id).copied().unwrap_or_else(|| agent.position());
            let to = agent.step_navigation(from, dt);
            self.positions.insert(*id, to);
        }

        for id in &ids {
            // Taken out so the agent can see the rest of the registry as its world.
            let Some(mut agent) = self.agents.remove(id) else {
                continue;
            };
            agent.update(dt, now, self);
            self.agents.insert(*id, agent);
        }

        self.flush();

        let removed: Vec<EntityId> = ids
            .into_iter()
            .filter(|id| self.agents.get(id).is_some_and(AgentController::is_removed))
            .collect();
        for id in removed {
            self.agents.remove(&id);
            self.positions.remove(&id);
            info!("Agent {id} removed from the world");
        }
    }

    /// Moves events raised outside a tick onto the bus.
    pub fn flush(&mut self) {
        let mut dropped = 0usize;
        for id in self.agent_ids() {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            for event in agent.drain_events() {
                if !self.bus.publish(event) {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!("Event bus full, dropped {dropped} events");
        }
    }

    /// Flushes and drains every pending event.
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        self.flush();
        self.bus.drain()
    }

    /// Flushes and hands every pending event to `handlers`.
    pub fn dispatch(&mut self, handlers: &mut [&mut dyn EventHandler]) -> usize {
        self.flush();
        self.bus.dispatch(handlers)
    }
}

impl AgentWorld for AgentRegistry {
    fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }

    fn sight(&self) -> &dyn LineOfSight {
        self.sight.as_ref()
    }

    fn combatant(&self, entity: EntityId) -> Option<&dyn Combatant> {
        if let Some(agent) = self.agents.get(&entity) {
            let agent: &dyn Combatant = agent;
            return Some(agent);
        }
        let body: &dyn Combatant = self.bodies.get(&entity)?.as_ref();
        Some(body)
    }

    fn combatant_mut(&mut self, entity: EntityId) -> Option<&mut dyn Combatant> {
        if let Some(agent) = self.agents.get_mut(&entity) {
            let agent: &mut dyn Combatant = agent;
            return Some(agent);
        }
        let body: &mut dyn Combatant = self.bodies.get_mut(&entity)?.as_mut();
        Some(body)
    }
}
