//! Agent states and the pure transition function.
//!
//! [`next`] looks only at a [`SensorSnapshot`] and the agent's tunables, so
//! the whole transition table can be exercised without a world, navigator
//! or status container. The controller gathers the snapshot, calls `next`
//! and performs the side effects.

use crate::config::AgentConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavior state. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Standing still, watching for a target.
    #[default]
    Idle,
    /// Walking the patrol route.
    Patrol,
    /// Closing in on the target.
    Approach,
    /// Waiting for the attack cooldown, then striking once.
    Attack,
    /// Recovering after a strike.
    Wait,
    /// Dead; awaiting removal.
    Dead,
}

impl AgentState {
    /// All states.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Idle,
            Self::Patrol,
            Self::Approach,
            Self::Attack,
            Self::Wait,
            Self::Dead,
        ]
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Patrol => "Patrol",
            Self::Approach => "Approach",
            Self::Attack => "Attack",
            Self::Wait => "Wait",
            Self::Dead => "Dead",
        }
    }

    /// Whether this state needs a live target.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        matches!(self, Self::Approach | Self::Attack | Self::Wait)
    }

    /// Whether no further transitions can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dead)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attitude toward potential targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Engages targets on sight.
    #[default]
    Hostile,
    /// Ignores targets until damaged, then turns hostile.
    Neutral,
    /// Never engages.
    Friendly,
}

impl Disposition {
    /// Whether sensing a target starts an approach.
    #[must_use]
    pub const fn engages(self) -> bool {
        matches!(self, Self::Hostile)
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Hostile agent sensed its target.
    TargetDetected,
    /// Idle long enough with a route to walk.
    PatrolTimerElapsed,
    /// One-shot route walked to the end.
    RouteFinished,
    /// Route emptied or navigation unavailable while patrolling.
    RouteUnavailable,
    /// Target came within attack radius.
    InAttackRange,
    /// Target went beyond detection radius.
    TargetOutOfRange,
    /// Target handle no longer resolves to a live entity.
    TargetMissing,
    /// Cooldown elapsed and one attack was resolved.
    AttackResolved,
    /// Recovery finished and the target is still in reach.
    WaitElapsed,
    /// Health reached zero.
    Lethal,
    /// Administrative override.
    Forced,
}

impl Trigger {
    /// Whether entering the new state should announce a lost target.
    #[must_use]
    pub const fn loses_target(self) -> bool {
        matches!(self, Self::TargetOutOfRange | Self::TargetMissing)
    }
}

/// Everything [`next`] needs to know about one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Absolute simulation time.
    pub now: f32,
    /// Time spent in the current state, including this tick.
    pub state_timer: f32,
    /// Current health; `None` when there is no status container.
    pub health: Option<i32>,
    /// Current disposition.
    pub disposition: Disposition,
    /// Distance to a live target; `None` when there is no such target.
    pub target_distance: Option<f32>,
    /// Target inside detection radius with clear line of sight.
    pub target_sensed: bool,
    /// Route has waypoints left and movement is available.
    pub patrol_available: bool,
    /// Navigation reports arrival at the current waypoint.
    pub arrived: bool,
    /// Earliest time the next attack may resolve.
    pub next_attack_ready_time: f32,
}

impl SensorSnapshot {
    /// Snapshot of an agent with nothing around it.
    #[must_use]
    pub fn quiet(now: f32) -> Self {
        Self {
            now,
            state_timer: 0.0,
            health: None,
            disposition: Disposition::Hostile,
            target_distance: None,
            target_sensed: false,
            patrol_available: false,
            arrived: false,
            next_attack_ready_time: 0.0,
        }
    }
}

/// A change of state and its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// New state.
    pub to: AgentState,
    /// Cause.
    pub trigger: Trigger,
}

impl Transition {
    /// Creates a transition.
    #[must_use]
    pub const fn new(to: AgentState, trigger: Trigger) -> Self {
        Self { to, trigger }
    }
}

/// Result of evaluating one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep running the current state's per-tick behavior.
    Stay,
    /// Patrol waypoint reached; advance along the route.
    AdvanceWaypoint,
    /// Leave the current state.
    Transition(Transition),
}

impl Decision {
    const fn to(state: AgentState, trigger: Trigger) -> Self {
        Self::Transition(Transition::new(state, trigger))
    }
}

/// The transition table.
#[must_use]
pub fn next(state: AgentState, snap: &SensorSnapshot, config: &AgentConfig) -> Decision {
    if state.is_terminal() {
        return Decision::Stay;
    }
    if snap.health.is_some_and(|h| h <= 0) {
        return Decision::to(AgentState::Dead, Trigger::Lethal);
    }

    let detects = snap.disposition.engages() && snap.target_sensed;

    match state {
        AgentState::Idle => {
            // Detection wins over the patrol timer.
            if detects {
                Decision::to(AgentState::Approach, Trigger::TargetDetected)
            } else if snap.state_timer > config.idle_patrol_delay && snap.patrol_available {
                Decision::to(AgentState::Patrol, Trigger::PatrolTimerElapsed)
            } else {
                Decision::Stay
            }
        },
        AgentState::Patrol => {
            if detects {
                Decision::to(AgentState::Approach, Trigger::TargetDetected)
            } else if !snap.patrol_available {
                Decision::to(AgentState::Idle, Trigger::RouteUnavailable)
            } else if snap.arrived {
                Decision::AdvanceWaypoint
            } else {
                Decision::Stay
            }
        },
        AgentState::Approach => match snap.target_distance {
            None => Decision::to(AgentState::Idle, Trigger::TargetMissing),
            Some(d) if d <= config.attack_radius => {
                Decision::to(AgentState::Attack, Trigger::InAttackRange)
            },
            Some(d) if d > config.detection_radius => {
                Decision::to(AgentState::Idle, Trigger::TargetOutOfRange)
            },
            Some(_) => Decision::Stay,
        },
        AgentState::Attack => {
            if snap.target_distance.is_none() {
                Decision::to(AgentState::Idle, Trigger::TargetMissing)
            } else if snap.now >= snap.next_attack_ready_time {
                Decision::to(AgentState::Wait, Trigger::AttackResolved)
            } else {
                Decision::Stay
            }
        },
        AgentState::Wait => {
            if snap.state_timer < config.wait_duration {
                return Decision::Stay;
            }
            match snap.target_distance {
                None => Decision::to(AgentState::Idle, Trigger::TargetMissing),
                Some(d) if d <= config.attack_radius => {
                    Decision::to(AgentState::Attack, Trigger::WaitElapsed)
                },
                Some(d) if d <= config.detection_radius => {
                    Decision::to(AgentState::Approach, Trigger::WaitElapsed)
                },
                Some(_) => Decision::to(AgentState::Idle, Trigger::TargetOutOfRange),
            }
        },
        AgentState::Dead => Decision::Stay,
    }
}
