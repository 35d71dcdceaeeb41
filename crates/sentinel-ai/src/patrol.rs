//! Patrol routes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Outcome of reaching the current waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolStep {
    /// Head for the waypoint at this index next.
    Next(usize),
    /// One-shot route is complete; index stays on the last waypoint.
    Finished,
}

/// Ordered waypoints with loop or one-shot traversal.
///
/// Invariant: `index < waypoints.len()` whenever the route is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    waypoints: Vec<Vec3>,
    index: usize,
    looping: bool,
    finished: bool,
}

impl PatrolRoute {
    /// Creates a route starting at the first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<Vec3>, looping: bool) -> Self {
        Self {
            waypoints,
            index: 0,
            looping,
            finished: false,
        }
    }

    /// Replaces the waypoints and rewinds to the first one.
    pub fn set_waypoints(&mut self, waypoints: Vec<Vec3>) {
        self.waypoints = waypoints;
        self.reset();
    }

    /// Sets loop policy.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Rewinds to the first waypoint and clears completion.
    pub fn reset(&mut self) {
        self.index = 0;
        self.finished = false;
    }

    /// Waypoint currently being walked to.
    #[must_use]
    pub fn current(&self) -> Option<Vec3> {
        self.waypoints.get(self.index).copied()
    }

    /// Current waypoint index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Whether the route loops.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether a one-shot route has been walked to the end.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether there is anything left to patrol.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.is_empty() && !self.finished
    }

    /// All waypoints.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Marks the current waypoint as reached and moves on.
    pub fn advance(&mut self) -> PatrolStep {
        let len = self.waypoints.len();
        if len == 0 || self.finished {
            return PatrolStep::Finished;
        }
        if self.looping {
            self.index = (self.index + 1) % len;
            PatrolStep::Next(self.index)
        } else if self.index + 1 < len {
            self.index += 1;
            PatrolStep::Next(self.index)
        } else {
            self.finished = true;
            PatrolStep::Finished
        }
    }
}
