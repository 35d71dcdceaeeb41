//! Navigation proxy: the controller's only view of movement.
//!
//! The controller requests destinations and polls arrival. Path planning,
//! steering and physics belong to whatever implements [`NavigationProxy`].

use glam::Vec3;
use parking_lot::Mutex;
use std::sync::Arc;

/// Poll-style movement interface.
pub trait NavigationProxy: std::fmt::Debug {
    /// Requests movement toward `destination`.
    fn set_destination(&mut self, destination: Vec3);

    /// Cancels movement.
    fn stop(&mut self);

    /// Whether a requested path is still being computed.
    fn is_path_pending(&self) -> bool;

    /// Distance left to the current destination (0 when idle).
    fn remaining_distance(&self) -> f32;

    /// Sets movement speed.
    fn set_speed(&mut self, speed: f32);

    /// Host integration step: moves the body from `position` over `dt` and
    /// returns where it ended up. Proxies that move bodies elsewhere keep the
    /// default.
    fn step(&mut self, position: Vec3, _dt: f32) -> Vec3 {
        position
    }
}

/// Whether a proxy has reached its destination within `tolerance`.
#[must_use]
pub fn has_arrived(nav: &dyn NavigationProxy, tolerance: f32) -> bool {
    !nav.is_path_pending() && nav.remaining_distance() <= tolerance
}

/// Walks in a straight line toward the destination.
///
/// A new destination stays "pending" until the next [`step`](NavigationProxy::step),
/// the way an asynchronous planner would report it.
#[derive(Debug, Clone)]
pub struct StraightLineNavigator {
    position: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    pending: bool,
}

impl StraightLineNavigator {
    /// Creates a stationary navigator.
    #[must_use]
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            destination: None,
            speed: speed.max(0.0),
            pending: false,
        }
    }

    /// Current destination.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    /// Current speed.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }
}

impl NavigationProxy for StraightLineNavigator {
    fn set_destination(&mut self, destination: Vec3) {
        self.destination = Some(destination);
        self.pending = true;
    }

    fn stop(&mut self) {
        self.destination = None;
        self.pending = false;
    }

    fn is_path_pending(&self) -> bool {
        self.pending
    }

    fn remaining_distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |dest| self.position.distance(dest))
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn step(&mut self, position: Vec3, dt: f32) -> Vec3 {
        self.position = position;
        self.pending = false;
        if let Some(dest) = self.destination {
            let to_dest = dest - self.position;
            let dist = to_dest.length();
            let travel = self.speed * dt.max(0.0);
            self.position = if dist <= travel || dist <= f32::EPSILON {
                dest
            } else {
                self.position + to_dest / dist * travel
            };
        }
        self.position
    }
}

/// A command received by a [`RecordingNavigator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavCommand {
    /// `set_destination`
    SetDestination(Vec3),
    /// `stop`
    Stop,
    /// `set_speed`
    SetSpeed(f32),
}

#[derive(Debug, Default)]
struct NavLog {
    commands: Vec<NavCommand>,
    pending: bool,
    remaining: f32,
}

/// Test double that records commands and reports scripted status.
///
/// Clones share one log, so a test keeps a clone after handing the
/// navigator to a controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    log: Arc<Mutex<NavLog>>,
}

impl RecordingNavigator {
    /// Creates a navigator that reports "arrived" until scripted otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<NavCommand> {
        self.log.lock().commands.clone()
    }

    /// Forgets recorded commands.
    pub fn clear(&self) {
        self.log.lock().commands.clear();
    }

    /// Scripts the remaining distance.
    pub fn set_remaining(&self, remaining: f32) {
        self.log.lock().remaining = remaining;
    }

    /// Scripts the path-pending flag.
    pub fn set_pending(&self, pending: bool) {
        self.log.lock().pending = pending;
    }

    /// Last destination requested.
    #[must_use]
    pub fn last_destination(&self) -> Option<Vec3> {
        self.log
            .lock()
            .commands
            .iter()
            .rev()
            .find_map(|c| match c {
                NavCommand::SetDestination(d) => Some(*d),
                _ => None,
            })
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.log
            .lock()
            .commands
            .iter()
            .filter(|c| matches!(c, NavCommand::Stop))
            .count()
    }
}

impl NavigationProxy for RecordingNavigator {
    fn set_destination(&mut self, destination: Vec3) {
        self.log
            .lock()
            .commands
            .push(NavCommand::SetDestination(destination));
    }

    fn stop(&mut self) {
        self.log.lock().commands.push(NavCommand::Stop);
    }

    fn is_path_pending(&self) -> bool {
        self.log.lock().pending
    }

    fn remaining_distance(&self) -> f32 {
        self.log.lock().remaining
    }

    fn set_speed(&mut self, speed: f32) {
        self.log.lock().commands.push(NavCommand::SetSpeed(speed));
    }
}
