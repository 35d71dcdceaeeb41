//! Outbound agent events and the bus the host drains after each tick.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::fault::AgentFault;
use crate::state::AgentState;
use sentinel_common::{EntityId, ItemTypeId};

/// Observable events for animation, UI, audio and quest listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// State changed
    StateChanged {
        /// Agent
        agent: EntityId,
        /// Previous state
        from: AgentState,
        /// New state
        to: AgentState,
    },
    /// Target sensed while idle or patrolling
    TargetDetected {
        /// Agent
        agent: EntityId,
        /// Target handle
        target: EntityId,
    },
    /// Target left detection range or stopped resolving
    TargetLost {
        /// Agent
        agent: EntityId,
    },
    /// One attack pushed through the target's combat contract
    AttackResolved {
        /// Attacker
        agent: EntityId,
        /// Target handle
        target: EntityId,
        /// Damage dealt
        damage: i32,
    },
    /// Health changed (health bar notification)
    HealthChanged {
        /// Agent
        agent: EntityId,
        /// Current health
        current: i32,
        /// Maximum health
        max: i32,
    },
    /// Agent died
    Death {
        /// Agent
        agent: EntityId,
    },
    /// An item dropped on death
    LootDropped {
        /// Agent that dropped it
        agent: EntityId,
        /// Item type
        item: ItemTypeId,
        /// Where it dropped
        position: Vec3,
    },
    /// Removal grace period elapsed; the host should destroy the entity
    Removed {
        /// Agent
        agent: EntityId,
    },
    /// A locally handled fault
    Fault {
        /// Agent
        agent: EntityId,
        /// What went wrong
        fault: AgentFault,
    },
}

impl AgentEvent {
    /// Agent the event is about.
    #[must_use]
    pub fn agent(&self) -> EntityId {
        match self {
            Self::StateChanged { agent, .. }
            | Self::TargetDetected { agent, .. }
            | Self::TargetLost { agent }
            | Self::AttackResolved { agent, .. }
            | Self::HealthChanged { agent, .. }
            | Self::Death { agent }
            | Self::LootDropped { agent, .. }
            | Self::Removed { agent }
            | Self::Fault { agent, .. } => *agent,
        }
    }
}

/// Event bus for broadcasting agent events to the host.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<AgentEvent>,
    /// Receiver for collecting events
    receiver: Receiver<AgentEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns `false` if the bus was full and the event dropped.
    pub fn publish(&self, event: AgentEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<AgentEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains pending events into every handler, in order.
    pub fn dispatch(&self, handlers: &mut [&mut dyn EventHandler]) -> usize {
        let mut count = 0;
        for event in self.receiver.try_iter() {
            for handler in handlers.iter_mut() {
                handler.handle(&event);
            }
            count += 1;
        }
        count
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<AgentEvent> {
        self.sender.clone()
    }
}

/// Observer for drained events.
pub trait EventHandler {
    /// Handles an event.
    fn handle(&mut self, event: &AgentEvent);
}

/// Handler that keeps every event it sees.
#[derive(Debug, Default)]
pub struct EventLog {
    /// Events in arrival order.
    pub events: Vec<AgentEvent>,
}

impl EventHandler for EventLog {
    fn handle(&mut self, event: &AgentEvent) {
        self.events.push(event.clone());
    }
}
