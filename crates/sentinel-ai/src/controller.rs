//! Per-agent behavior controller.
//!
//! Each tick the controller reads its sensors into a [`SensorSnapshot`],
//! asks [`state::next`] what to do, and applies the answer: entry side
//! effects, attack resolution, patrol progress and outbound events.
//! Collaborators (navigation and status) are injected at build time and
//! may be absent; the features that need them degrade instead of failing.

use glam::Vec3;
use sentinel_common::EntityId;
use tracing::{debug, info, trace, warn};

use crate::combat::{apply_damage, Combatant};
use crate::config::AgentConfig;
use crate::events::AgentEvent;
use crate::fault::{AgentFault, Feature};
use crate::loot::LootTable;
use crate::navigation::{has_arrived, NavigationProxy};
use crate::patrol::{PatrolRoute, PatrolStep};
use crate::sensor::{can_sense, NO_TARGET_DISTANCE};
use crate::state::{self, AgentState, Decision, Disposition, SensorSnapshot, Transition, Trigger};
use crate::status::{Modifier, ModifierKind, StatusContainer, StatusSet};
use crate::world::AgentWorld;
use sentinel_common::ModifierId;

// ============================================================================
// Builder
// ============================================================================

/// Assembles an [`AgentController`] with its collaborators.
#[derive(Debug)]
pub struct AgentBuilder {
    id: EntityId,
    config: AgentConfig,
    navigator: Option<Box<dyn NavigationProxy>>,
    status: Option<Box<dyn StatusContainer>>,
    seed: Option<u64>,
    position: Vec3,
    target: Option<EntityId>,
}

impl AgentBuilder {
    /// Injects the navigation proxy.
    #[must_use]
    pub fn navigator(mut self, navigator: impl NavigationProxy + 'static) -> Self {
        self.navigator = Some(Box::new(navigator));
        self
    }

    /// Replaces the default [`StatusSet`].
    #[must_use]
    pub fn status(mut self, status: impl StatusContainer + 'static) -> Self {
        self.status = Some(Box::new(status));
        self
    }

    /// Builds without a status container; health and death are disabled.
    #[must_use]
    pub fn without_status(mut self) -> Self {
        self.status = None;
        self
    }

    /// Seeds the loot roller.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Initial position.
    #[must_use]
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Initial target handle.
    #[must_use]
    pub fn target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Finishes the controller. Missing collaborators are reported once here.
    #[must_use]
    pub fn build(self) -> AgentController {
        let Self {
            id,
            config,
            navigator,
            status,
            seed,
            position,
            target,
        } = self;

        let rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let route = PatrolRoute::new(config.waypoints.clone(), config.patrol_loop);

        let mut agent = AgentController {
            id,
            disposition: config.disposition,
            move_speed: config.move_speed,
            loot: config.loot.clone(),
            config,
            state: AgentState::Idle,
            state_timer: 0.0,
            now: 0.0,
            next_attack_ready_time: 0.0,
            route,
            target,
            position,
            last_target_position: None,
            navigator,
            status,
            rng,
            outbox: Vec::new(),
            removal_countdown: None,
            removed: false,
            forwarded_speed: None,
        };

        if agent.navigator.is_none() {
            warn!("Agent {id} has no navigation proxy; movement and patrol disabled");
            agent.emit_fault(AgentFault::ConfigurationError(Feature::Movement));
        }
        if agent.status.is_none() {
            warn!("Agent {id} has no status container; health and death disabled");
            agent.emit_fault(AgentFault::ConfigurationError(Feature::Health));
        }
        agent.sync_speed();

        debug!("Built agent {id} ({} waypoints)", agent.route.len());
        agent
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Finite-state behavior controller for one agent.
#[derive(Debug)]
pub struct AgentController {
    id: EntityId,
    config: AgentConfig,
    disposition: Disposition,
    state: AgentState,
    state_timer: f32,
    now: f32,
    next_attack_ready_time: f32,
    route: PatrolRoute,
    target: Option<EntityId>,
    position: Vec3,
    last_target_position: Option<Vec3>,
    navigator: Option<Box<dyn NavigationProxy>>,
    status: Option<Box<dyn StatusContainer>>,
    loot: LootTable,
    rng: fastrand::Rng,
    outbox: Vec<AgentEvent>,
    removal_countdown: Option<f32>,
    removed: bool,
    move_speed: f32,
    forwarded_speed: Option<f32>,
}

impl AgentController {
    /// Starts building an agent. The status container defaults to a
    /// [`StatusSet`] at `config.max_health`; there is no default navigator.
    #[must_use]
    pub fn builder(id: EntityId, config: AgentConfig) -> AgentBuilder {
        let status: Box<dyn StatusContainer> = Box::new(StatusSet::new(config.max_health));
        AgentBuilder {
            id,
            config,
            navigator: None,
            status: Some(status),
            seed: None,
            position: Vec3::ZERO,
            target: None,
        }
    }

    /// Advances the agent by one tick.
    ///
    /// At most one state transition happens per call.
    pub fn update<W: AgentWorld + ?Sized>(&mut self, dt: f32, now: f32, world: &mut W) {
        if self.removed {
            return;
        }
        if self.state.is_terminal() {
            self.count_down_removal(dt);
            return;
        }
        self.now = now;

        if let Some(position) = world.position_of(self.id) {
            self.position = position;
        }
        self.state_timer += dt;
        if let Some(status) = self.status.as_mut() {
            status.tick(dt);
        }
        self.sync_speed();

        if self.is_stunned() {
            trace!("Agent {} stunned, skipping decision", self.id);
            return;
        }

        let snapshot = self.sense(now, world);
        match state::next(self.state, &snapshot, &self.config) {
            Decision::Stay => self.run_state(),
            Decision::AdvanceWaypoint => self.advance_patrol(),
            Decision::Transition(transition) => self.apply(transition, world),
        }
    }

    fn sense<W: AgentWorld + ?Sized>(&mut self, now: f32, world: &W) -> SensorSnapshot {
        let target_position = self.target.and_then(|t| world.live_position(t));
        self.last_target_position = target_position;

        SensorSnapshot {
            now,
            state_timer: self.state_timer,
            health: self.status.as_ref().map(|s| s.health()),
            disposition: self.disposition,
            target_distance: target_position.map(|p| self.position.distance(p)),
            target_sensed: can_sense(
                self.position,
                target_position,
                self.config.detection_radius,
                world.sight(),
            ),
            patrol_available: self.navigator.is_some() && self.route.is_available(),
            arrived: self
                .navigator
                .as_deref()
                .is_some_and(|nav| has_arrived(nav, self.config.arrival_tolerance)),
            next_attack_ready_time: self.next_attack_ready_time,
        }
    }

    /// Per-tick work for the current state when nothing changes.
    fn run_state(&mut self) {
        if self.state != AgentState::Approach {
            return;
        }
        if let (Some(nav), Some(goal)) = (self.navigator.as_mut(), self.last_target_position) {
            trace!("Agent {} chasing target at {goal:?}", self.id);
            nav.set_destination(goal);
        }
    }

    fn advance_patrol(&mut self) {
        match self.route.advance() {
            PatrolStep::Next(index) => {
                if let (Some(nav), Some(waypoint)) = (self.navigator.as_mut(), self.route.current())
                {
                    nav.set_destination(waypoint);
                }
                debug!("Agent {} heading to waypoint {index}", self.id);
            },
            PatrolStep::Finished => {
                info!("Agent {} finished its patrol route", self.id);
                self.enter(AgentState::Idle, Trigger::RouteFinished);
            },
        }
    }

    fn apply<W: AgentWorld + ?Sized>(&mut self, transition: Transition, world: &mut W) {
        if transition.trigger == Trigger::AttackResolved {
            if let Some(target) = self.target {
                self.resolve_attack(target, world);
            }
            self.next_attack_ready_time = self.now + self.config.attack_cooldown;
        }
        self.enter(transition.to, transition.trigger);
    }

    /// Switches state and runs the entry side effect of the new state.
    fn enter(&mut self, to: AgentState, trigger: Trigger) {
        let from = self.state;
        self.state = to;
        self.state_timer = 0.0;
        debug!("Agent {}: {from} -> {to} ({trigger:?})", self.id);

        self.emit(AgentEvent::StateChanged {
            agent: self.id,
            from,
            to,
        });
        match trigger {
            Trigger::TargetDetected => {
                if let Some(target) = self.target {
                    self.emit(AgentEvent::TargetDetected {
                        agent: self.id,
                        target,
                    });
                }
            },
            t if t.loses_target() => self.emit(AgentEvent::TargetLost { agent: self.id }),
            _ => {},
        }

        match to {
            AgentState::Idle => self.stop_navigation(),
            AgentState::Patrol => {
                if let (Some(nav), Some(waypoint)) = (self.navigator.as_mut(), self.route.current())
                {
                    nav.set_destination(waypoint);
                }
            },
            AgentState::Approach => {
                if let (Some(nav), Some(goal)) =
                    (self.navigator.as_mut(), self.last_target_position)
                {
                    nav.set_destination(goal);
                }
            },
            AgentState::Attack => {
                self.stop_navigation();
                self.next_attack_ready_time = self.next_attack_ready_time.max(self.now);
            },
            AgentState::Wait => {},
            AgentState::Dead => self.die(),
        }
    }

    fn die(&mut self) {
        self.stop_navigation();

        let drops = self.loot.roll(&mut self.rng);
        for item in drops {
            self.emit(AgentEvent::LootDropped {
                agent: self.id,
                item,
                position: self.position,
            });
        }
        self.emit(AgentEvent::Death { agent: self.id });
        self.removal_countdown = Some(self.config.despawn_delay);
        info!(
            "Agent {} died at {:?}, removal in {}s",
            self.id, self.position, self.config.despawn_delay
        );
    }

    fn count_down_removal(&mut self, dt: f32) {
        let Some(remaining) = self.removal_countdown.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.removal_countdown = None;
            self.removed = true;
            self.emit(AgentEvent::Removed { agent: self.id });
            debug!("Agent {} removed", self.id);
        }
    }

    /// Pushes one attack through the target's combat contract.
    ///
    /// Returns `false` when the target has no combatant to hit.
    pub fn resolve_attack<W: AgentWorld + ?Sized>(
        &mut self,
        target: EntityId,
        world: &mut W,
    ) -> bool {
        let damage = self.config.attack_damage;
        let Some(body) = world.combatant_mut(target) else {
            debug!("Agent {} attacked {target}, which has no combatant", self.id);
            return false;
        };
        body.take_damage(damage);
        trace!(
            "Agent {} hit {target} for {damage}, {} left",
            self.id,
            body.current_health()
        );
        self.emit(AgentEvent::AttackResolved {
            agent: self.id,
            target,
            damage,
        });
        true
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Replaces the patrol route, rewinding to its first waypoint.
    pub fn set_patrol_route(&mut self, waypoints: Vec<Vec3>) {
        if self.is_inert() {
            return;
        }
        self.route.set_waypoints(waypoints);
        if self.state == AgentState::Patrol {
            if let (Some(nav), Some(waypoint)) = (self.navigator.as_mut(), self.route.current()) {
                nav.set_destination(waypoint);
            }
        }
    }

    /// Switches between looping and one-shot patrols.
    pub fn set_patrol_looping(&mut self, looping: bool) {
        if self.is_inert() {
            return;
        }
        self.route.set_looping(looping);
    }

    /// Moves to `requested` right away, running its entry side effect.
    ///
    /// States that cannot be entered (a target state without a live target,
    /// a patrol with nothing to walk) resolve to Idle and report a fault. A
    /// dead agent ignores the request.
    pub fn force_state<W: AgentWorld + ?Sized>(&mut self, requested: AgentState, world: &W) {
        if self.is_inert() {
            warn!("Agent {} is dead, ignoring forced {requested}", self.id);
            self.emit_fault(AgentFault::InvalidTransitionRequest {
                requested,
                resolved: self.state,
            });
            return;
        }

        let valid = match requested {
            AgentState::Patrol => self.navigator.is_some() && self.route.is_available(),
            s if s.requires_target() => {
                let live = self.target.and_then(|t| world.live_position(t));
                self.last_target_position = live;
                live.is_some()
            },
            _ => true,
        };
        if !valid {
            warn!("Agent {} cannot enter {requested} now, going Idle", self.id);
            self.emit_fault(AgentFault::InvalidTransitionRequest {
                requested,
                resolved: AgentState::Idle,
            });
            self.enter(AgentState::Idle, Trigger::Forced);
            return;
        }

        if requested == AgentState::Dead {
            if let Some(status) = self.status.as_mut() {
                status.set_health(0);
            }
        }
        self.enter(requested, Trigger::Forced);
    }

    /// Changes disposition. Ignored once dead.
    pub fn set_disposition(&mut self, disposition: Disposition) {
        if self.is_inert() {
            return;
        }
        self.disposition = disposition;
    }

    /// Sets or clears the target handle.
    pub fn set_target(&mut self, target: Option<EntityId>) {
        if self.is_inert() {
            return;
        }
        if self.target != target {
            self.last_target_position = None;
        }
        self.target = target;
    }

    /// Sets base movement speed; navigation receives it scaled by modifiers.
    pub fn set_move_speed(&mut self, speed: f32) {
        if self.is_inert() {
            return;
        }
        self.move_speed = speed;
        self.sync_speed();
    }

    /// Cancels navigation and goes Idle.
    pub fn stop_all_behavior(&mut self) {
        if self.is_inert() {
            return;
        }
        self.enter(AgentState::Idle, Trigger::Forced);
    }

    /// Restores full health, rewinds the patrol and goes Idle.
    ///
    /// A dead agent stays dead.
    pub fn reset_to_initial_state(&mut self) {
        if self.is_inert() {
            warn!("Agent {} is dead, reset ignored", self.id);
            return;
        }
        if let Some(status) = self.status.as_mut() {
            let max = status.max_health();
            status.set_health(max);
            self.emit(AgentEvent::HealthChanged {
                agent: self.id,
                current: max,
                max,
            });
        }
        self.route.reset();
        self.enter(AgentState::Idle, Trigger::Forced);
    }

    /// Adds a status modifier.
    pub fn add_modifier(&mut self, modifier: Modifier) {
        if self.is_inert() {
            return;
        }
        if let Some(status) = self.status.as_mut() {
            status.add_modifier(modifier);
            self.sync_speed();
        }
    }

    /// Removes a status modifier by handle.
    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        if self.is_inert() {
            return false;
        }
        let removed = self
            .status
            .as_mut()
            .is_some_and(|status| status.remove_modifier(id));
        if removed {
            self.sync_speed();
        }
        removed
    }

    /// Whether a modifier of `kind` is active.
    #[must_use]
    pub fn has_modifier_of_type(&self, kind: ModifierKind) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.has_modifier_of_type(kind))
    }

    /// Moves the agent through its navigator and returns the new position.
    pub fn step_navigation(&mut self, position: Vec3, dt: f32) -> Vec3 {
        let next = match self.navigator.as_mut() {
            Some(nav) if !self.state.is_terminal() => nav.step(position, dt),
            _ => position,
        };
        self.position = next;
        next
    }

    /// Takes every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Entity handle.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Seconds since the current state was entered.
    #[must_use]
    pub const fn time_since_state_entry(&self) -> f32 {
        self.state_timer
    }

    /// Current disposition.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Target handle.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Last known position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Tunables.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Earliest time the next attack may resolve.
    #[must_use]
    pub const fn next_attack_ready_time(&self) -> f32 {
        self.next_attack_ready_time
    }

    /// Patrol route and progress.
    #[must_use]
    pub const fn patrol_route(&self) -> &PatrolRoute {
        &self.route
    }

    /// Index of the current waypoint.
    #[must_use]
    pub const fn waypoint_index(&self) -> usize {
        self.route.index()
    }

    /// Seconds left before removal, while dead.
    #[must_use]
    pub const fn removal_countdown(&self) -> Option<f32> {
        self.removal_countdown
    }

    /// Whether the removal grace period has elapsed.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    /// Distance to a live target.
    pub fn try_distance_to_target<W: AgentWorld + ?Sized>(
        &self,
        world: &W,
    ) -> Result<f32, AgentFault> {
        self.target
            .and_then(|t| world.live_position(t))
            .map(|p| self.position.distance(p))
            .ok_or(AgentFault::OutOfRangeQuery)
    }

    /// Distance to the target, or [`NO_TARGET_DISTANCE`] without one.
    pub fn distance_to_target<W: AgentWorld + ?Sized>(&self, world: &W) -> f32 {
        self.try_distance_to_target(world).unwrap_or(NO_TARGET_DISTANCE)
    }

    /// Target is inside detection radius with clear line of sight.
    pub fn can_sense_target<W: AgentWorld + ?Sized>(&self, world: &W) -> bool {
        let target_position = self.target.and_then(|t| world.live_position(t));
        can_sense(
            self.position,
            target_position,
            self.config.detection_radius,
            world.sight(),
        )
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn emit(&mut self, event: AgentEvent) {
        self.outbox.push(event);
    }

    fn emit_fault(&mut self, fault: AgentFault) {
        self.emit(AgentEvent::Fault {
            agent: self.id,
            fault,
        });
    }

    fn stop_navigation(&mut self) {
        if let Some(nav) = self.navigator.as_mut() {
            nav.stop();
        }
    }

    /// Dead or removed agents accept no commands.
    fn is_inert(&self) -> bool {
        self.removed || self.state.is_terminal()
    }

    fn is_stunned(&self) -> bool {
        self.has_modifier_of_type(ModifierKind::Stunned)
    }

    fn sync_speed(&mut self) {
        let multiplier = self
            .status
            .as_ref()
            .map_or(1.0, |status| status.speed_multiplier());
        let speed = self.move_speed * multiplier;
        if self.forwarded_speed == Some(speed) {
            return;
        }
        if let Some(nav) = self.navigator.as_mut() {
            nav.set_speed(speed);
            self.forwarded_speed = Some(speed);
        }
    }
}

impl Combatant for AgentController {
    fn take_damage(&mut self, amount: i32) {
        if self.is_inert() {
            return;
        }
        if self.disposition == Disposition::Neutral {
            info!("Agent {} provoked, turning hostile", self.id);
            self.disposition = Disposition::Hostile;
        }

        let Some(status) = self.status.as_mut() else {
            debug!("Agent {} has no health to damage", self.id);
            return;
        };
        let health = apply_damage(status.health(), amount);
        status.set_health(health);
        let max = status.max_health();
        self.emit(AgentEvent::HealthChanged {
            agent: self.id,
            current: health,
            max,
        });

        if health <= 0 {
            self.enter(AgentState::Dead, Trigger::Lethal);
        }
    }

    fn current_health(&self) -> i32 {
        self.status.as_ref().map_or(0, |status| status.health())
    }

    fn max_health(&self) -> i32 {
        self.status.as_ref().map_or(0, |status| status.max_health())
    }

    fn is_dead(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Dummy;
    use crate::navigation::{NavCommand, RecordingNavigator};
    use crate::world::MockWorld;
    use proptest::prelude::*;
    use sentinel_common::ItemTypeId;

    const DT: f32 = 0.1;

    struct Harness {
        agent: AgentController,
        nav: RecordingNavigator,
        world: MockWorld,
        target: EntityId,
        now: f32,
    }

    impl Harness {
        fn new(config: AgentConfig) -> Self {
            let nav = RecordingNavigator::new();
            let id = EntityId::new();
            let target = EntityId::new();
            let mut world = MockWorld::new();
            world.place(id, Vec3::ZERO);
            let agent = AgentController::builder(id, config)
                .navigator(nav.clone())
                .target(target)
                .seed(7)
                .build();
            Self {
                agent,
                nav,
                world,
                target,
                now: 0.0,
            }
        }

        fn with_player(mut self, distance: f32, health: i32) -> Self {
            self.world
                .add_body(self.target, Dummy::new(health), Vec3::new(distance, 0.0, 0.0));
            self
        }

        fn move_player(&mut self, distance: f32) {
            self.world.place(self.target, Vec3::new(distance, 0.0, 0.0));
        }

        fn tick(&mut self) {
            self.tick_by(DT);
        }

        fn tick_by(&mut self, dt: f32) {
            self.now += dt;
            self.agent.update(dt, self.now, &mut self.world);
        }

        fn run_for(&mut self, seconds: f32) {
            let steps = (seconds / DT).round() as usize;
            for _ in 0..steps {
                self.tick();
            }
        }

        fn player(&self) -> &Dummy {
            self.world.body(self.target).expect("player body")
        }
    }

    fn state_changes(events: &[AgentEvent]) -> Vec<(AgentState, AgentState)> {
        events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::StateChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_approach_then_attack_on_arrival() {
        let mut h = Harness::new(AgentConfig::default()).with_player(8.0, 100);

        h.tick();
        assert_eq!(h.agent.state(), AgentState::Approach);
        assert_eq!(h.nav.last_destination(), Some(Vec3::new(8.0, 0.0, 0.0)));

        h.move_player(1.5);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Attack);

        let events = h.agent.drain_events();
        assert_eq!(
            state_changes(&events),
            vec![
                (AgentState::Idle, AgentState::Approach),
                (AgentState::Approach, AgentState::Attack),
            ]
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::TargetDetected { target, .. } if *target == h.target)));
    }

    #[test]
    fn test_attack_cycle_respects_cooldown() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 1000);

        // Idle -> Approach -> Attack
        h.tick();
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Attack);

        // Strike lands as soon as Attack is re-evaluated.
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Wait);
        assert_eq!(h.player().hits_taken, 1);
        assert_eq!(h.player().current_health(), 990);
        let first_strike = h.now;
        assert!((h.agent.next_attack_ready_time() - (first_strike + 1.5)).abs() < 1e-4);

        // Wait 1s, back to Attack, hold until the cooldown passes.
        let mut ticks = 0;
        while h.agent.state() == AgentState::Wait {
            h.tick();
            ticks += 1;
            assert!(ticks < 50);
        }
        assert!(h.now - first_strike >= 1.0 - 1e-4);
        assert_eq!(h.agent.state(), AgentState::Attack);
        assert_eq!(h.player().hits_taken, 1);

        while h.agent.state() == AgentState::Attack {
            h.tick();
        }
        assert_eq!(h.player().hits_taken, 2);
        assert!(h.now >= first_strike + 1.5 - 1e-4);
    }

    #[test]
    fn test_damage_is_clamped_and_fatal_damage_kills_synchronously() {
        let config = AgentConfig {
            max_health: 100,
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config);

        h.agent.take_damage(30);
        assert_eq!(h.agent.current_health(), 70);
        assert_eq!(h.agent.state(), AgentState::Idle);

        h.agent.take_damage(80);
        assert_eq!(h.agent.current_health(), 0);
        assert_eq!(h.agent.state(), AgentState::Dead);
        assert!(h.agent.is_dead());
        assert_eq!(h.agent.removal_countdown(), Some(3.0));

        let events = h.agent.drain_events();
        assert!(events.iter().any(|e| matches!(e, AgentEvent::Death { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::HealthChanged { current: 0, max: 100, .. })));
    }

    #[test]
    fn test_dead_agent_ignores_everything_until_removed() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 100);
        h.agent.take_damage(1000);
        h.agent.drain_events();
        h.nav.clear();

        let slow = Modifier::new(ModifierKind::Slowed).with_magnitude(0.5);
        let slow_id = slow.id;
        let ready = h.agent.next_attack_ready_time();

        h.agent.take_damage(10);
        h.agent.force_state(AgentState::Attack, &h.world);
        h.agent.reset_to_initial_state();
        h.agent.set_disposition(Disposition::Friendly);
        h.agent.set_move_speed(9.0);
        h.agent.set_patrol_route(vec![Vec3::Z]);
        h.agent.set_patrol_looping(false);
        h.agent.set_target(None);
        h.agent.add_modifier(slow);
        assert!(!h.agent.remove_modifier(slow_id));

        assert_eq!(h.agent.disposition(), Disposition::Hostile);
        assert_eq!(h.agent.target(), Some(h.target));
        assert!(h.agent.patrol_route().is_empty());
        assert!(h.agent.patrol_route().is_looping());
        assert!(!h.agent.has_modifier_of_type(ModifierKind::Slowed));
        for _ in 0..5 {
            h.tick_by(0.5);
            assert_eq!(h.agent.state(), AgentState::Dead);
            assert!(!h.agent.is_removed());
        }
        assert_eq!(h.player().hits_taken, 0);
        assert!(h.nav.commands().is_empty());
        assert_eq!(h.agent.next_attack_ready_time(), ready);
        assert_eq!(h.agent.time_since_state_entry(), 0.0);
        assert_eq!(h.agent.now, 0.0);

        h.tick_by(0.5);
        assert!(h.agent.is_removed());
        let events = h.agent.drain_events();
        assert!(matches!(events.last(), Some(AgentEvent::Removed { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, AgentEvent::StateChanged { .. } | AgentEvent::HealthChanged { .. })));

        h.tick();
        assert!(h.agent.drain_events().is_empty());
    }

    #[test]
    fn test_loot_drops_on_death() {
        let config = AgentConfig {
            loot: LootTable::default()
                .with(ItemTypeId::new(1), 1.0)
                .with(ItemTypeId::new(2), 0.0),
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config);
        h.world.place(h.agent.id(), Vec3::new(3.0, 0.0, 4.0));
        h.tick();
        h.agent.take_damage(100);

        let drops: Vec<_> = h
            .agent
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::LootDropped { item, position, .. } => Some((item, position)),
                _ => None,
            })
            .collect();
        assert_eq!(drops, vec![(ItemTypeId::new(1), Vec3::new(3.0, 0.0, 4.0))]);
    }

    #[test]
    fn test_target_lost_when_it_walks_away() {
        let mut h = Harness::new(AgentConfig::default()).with_player(8.0, 100);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Approach);

        h.move_player(10.5);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(h
            .agent
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::TargetLost { .. })));
        assert!(h.nav.stop_count() >= 1);
    }

    #[test]
    fn test_target_removal_mid_attack_returns_to_idle() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 100);
        h.tick();
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Attack);

        h.world.remove(h.target);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert_eq!(h.agent.distance_to_target(&h.world), NO_TARGET_DISTANCE);
        assert_eq!(
            h.agent.try_distance_to_target(&h.world),
            Err(AgentFault::OutOfRangeQuery)
        );
    }

    #[test]
    fn test_dead_target_counts_as_missing() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 10);
        h.tick();
        h.tick();
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Wait);
        assert!(h.player().is_dead());

        h.run_for(1.5);
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(!h.agent.can_sense_target(&h.world));
    }

    #[test]
    fn test_blocked_sight_prevents_detection() {
        let mut h = Harness::new(AgentConfig::default()).with_player(8.0, 100);
        h.world.block_sight(Vec3::new(4.0, 0.0, 0.0), 1.0);
        h.run_for(1.0);
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(!h.agent.can_sense_target(&h.world));
        assert!((h.agent.distance_to_target(&h.world) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_neutral_turns_hostile_when_hit() {
        let config = AgentConfig {
            disposition: Disposition::Neutral,
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config).with_player(5.0, 100);
        h.run_for(1.0);
        assert_eq!(h.agent.state(), AgentState::Idle);

        h.agent.take_damage(1);
        assert_eq!(h.agent.disposition(), Disposition::Hostile);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Approach);
    }

    #[test]
    fn test_patrol_one_shot_ends_idle_on_last_waypoint() {
        let waypoints = vec![Vec3::X, Vec3::Y, Vec3::Z];
        let config = AgentConfig {
            patrol_loop: false,
            waypoints: waypoints.clone(),
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config);
        h.nav.set_remaining(5.0);

        h.run_for(2.1);
        assert_eq!(h.agent.state(), AgentState::Patrol);
        assert_eq!(h.nav.last_destination(), Some(Vec3::X));

        h.nav.set_remaining(0.0);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Patrol);
        assert_eq!(h.agent.waypoint_index(), 1);
        assert_eq!(h.nav.last_destination(), Some(Vec3::Y));

        h.tick();
        assert_eq!(h.agent.waypoint_index(), 2);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert_eq!(h.agent.waypoint_index(), 2);

        // Finished routes are not walked again.
        h.run_for(5.0);
        assert_eq!(h.agent.state(), AgentState::Idle);
        let destinations: Vec<_> = h
            .nav
            .commands()
            .into_iter()
            .filter(|c| matches!(c, NavCommand::SetDestination(_)))
            .collect();
        assert_eq!(destinations.len(), waypoints.len());
    }

    #[test]
    fn test_looping_patrol_wraps() {
        let config = AgentConfig {
            waypoints: vec![Vec3::X, Vec3::Y],
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config);
        h.nav.set_remaining(5.0);
        h.run_for(2.1);
        assert_eq!(h.agent.state(), AgentState::Patrol);

        h.nav.set_remaining(0.0);
        h.tick();
        h.tick();
        assert_eq!(h.agent.waypoint_index(), 0);
        assert_eq!(h.agent.state(), AgentState::Patrol);
    }

    #[test]
    fn test_set_patrol_route_rewinds_without_state_change() {
        let config = AgentConfig {
            waypoints: vec![Vec3::X, Vec3::Y],
            ..AgentConfig::default()
        };
        let mut h = Harness::new(config);
        h.nav.set_remaining(5.0);
        h.run_for(2.1);
        h.nav.set_remaining(0.0);
        h.tick();
        assert_eq!(h.agent.waypoint_index(), 1);

        h.agent.set_patrol_route(vec![Vec3::NEG_X, Vec3::NEG_Y, Vec3::NEG_Z]);
        assert_eq!(h.agent.waypoint_index(), 0);
        assert_eq!(h.agent.state(), AgentState::Patrol);
        assert_eq!(h.nav.last_destination(), Some(Vec3::NEG_X));
    }

    #[test]
    fn test_force_state_round_trips_with_one_entry_effect() {
        let mut h = Harness::new(AgentConfig {
            waypoints: vec![Vec3::X],
            ..AgentConfig::default()
        })
        .with_player(5.0, 100);
        h.tick();

        for state in [
            AgentState::Idle,
            AgentState::Patrol,
            AgentState::Approach,
            AgentState::Attack,
        ] {
            h.nav.clear();
            h.agent.force_state(state, &h.world);
            assert_eq!(h.agent.state(), state);
            assert_eq!(h.agent.time_since_state_entry(), 0.0);
            assert_eq!(h.nav.commands().len(), 1, "{state} entry effect");
        }

        h.nav.clear();
        h.agent.force_state(AgentState::Wait, &h.world);
        assert_eq!(h.agent.state(), AgentState::Wait);
        assert!(h.nav.commands().is_empty());
    }

    #[test]
    fn test_forced_approach_before_first_tick_heads_for_target() {
        let mut h = Harness::new(AgentConfig::default()).with_player(6.0, 100);
        h.nav.clear();

        h.agent.force_state(AgentState::Approach, &h.world);
        assert_eq!(h.agent.state(), AgentState::Approach);
        assert_eq!(
            h.nav.commands(),
            vec![NavCommand::SetDestination(Vec3::new(6.0, 0.0, 0.0))]
        );
    }

    #[test]
    fn test_forced_approach_after_retarget_uses_new_target() {
        let mut h = Harness::new(AgentConfig::default()).with_player(6.0, 100);
        h.tick();
        let other = EntityId::new();
        h.world
            .add_body(other, Dummy::new(50), Vec3::new(0.0, 0.0, 7.0));
        h.agent.set_target(Some(other));
        h.nav.clear();

        h.agent.force_state(AgentState::Approach, &h.world);
        assert_eq!(
            h.nav.commands(),
            vec![NavCommand::SetDestination(Vec3::new(0.0, 0.0, 7.0))]
        );
    }

    #[test]
    fn test_force_attack_on_dead_target_goes_idle() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 10);
        h.tick();
        h.world
            .combatant_mut(h.target)
            .expect("player body")
            .take_damage(10);
        assert!(h.player().is_dead());
        h.agent.drain_events();

        h.agent.force_state(AgentState::Attack, &h.world);
        assert_eq!(h.agent.state(), AgentState::Idle);
        let events = h.agent.drain_events();
        assert!(events.contains(&AgentEvent::Fault {
            agent: h.agent.id(),
            fault: AgentFault::InvalidTransitionRequest {
                requested: AgentState::Attack,
                resolved: AgentState::Idle,
            },
        }));
        assert!(!state_changes(&events)
            .iter()
            .any(|(_, to)| *to == AgentState::Attack));
    }

    #[test]
    fn test_force_wait_on_removed_target_goes_idle() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 100);
        h.tick();
        h.world.remove(h.target);

        h.agent.force_state(AgentState::Wait, &h.world);
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(h.agent.drain_events().iter().any(|e| matches!(
            e,
            AgentEvent::Fault {
                fault: AgentFault::InvalidTransitionRequest {
                    requested: AgentState::Wait,
                    ..
                },
                ..
            }
        )));
    }

    #[test]
    fn test_force_target_state_without_target_goes_idle() {
        let id = EntityId::new();
        let mut agent = AgentController::builder(id, AgentConfig::default())
            .navigator(RecordingNavigator::new())
            .build();
        agent.drain_events();

        agent.force_state(AgentState::Attack, &MockWorld::new());
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(agent.drain_events().contains(&AgentEvent::Fault {
            agent: id,
            fault: AgentFault::InvalidTransitionRequest {
                requested: AgentState::Attack,
                resolved: AgentState::Idle,
            },
        }));
    }

    #[test]
    fn test_force_dead_runs_death_sequence() {
        let mut h = Harness::new(AgentConfig::default());
        h.agent.force_state(AgentState::Dead, &h.world);
        assert!(h.agent.is_dead());
        assert_eq!(h.agent.current_health(), 0);
        assert!(h
            .agent
            .drain_events()
            .iter()
            .any(|e| matches!(e, AgentEvent::Death { .. })));
    }

    #[test]
    fn test_attack_ready_time_never_decreases() {
        let mut h = Harness::new(AgentConfig::default()).with_player(1.0, 1000);
        let mut last = h.agent.next_attack_ready_time();
        for _ in 0..100 {
            h.tick();
            let ready = h.agent.next_attack_ready_time();
            assert!(ready >= last);
            last = ready;
        }
        assert!(h.player().hits_taken >= 2);
    }

    #[test]
    fn test_missing_collaborators_degrade() {
        let id = EntityId::new();
        let mut agent = AgentController::builder(id, AgentConfig::default())
            .without_status()
            .build();
        let events = agent.drain_events();
        assert!(events.contains(&AgentEvent::Fault {
            agent: id,
            fault: AgentFault::ConfigurationError(Feature::Movement),
        }));
        assert!(events.contains(&AgentEvent::Fault {
            agent: id,
            fault: AgentFault::ConfigurationError(Feature::Health),
        }));

        agent.take_damage(500);
        assert!(!agent.is_dead());
        assert_eq!(agent.current_health(), 0);

        let mut world = MockWorld::new();
        agent.update(DT, DT, &mut world);
        assert_eq!(agent.state(), AgentState::Idle);
        assert!(agent.drain_events().is_empty());
    }

    #[test]
    fn test_stun_freezes_decisions_and_slow_scales_speed() {
        let mut h = Harness::new(AgentConfig {
            move_speed: 4.0,
            ..AgentConfig::default()
        })
        .with_player(5.0, 100);
        assert_eq!(h.nav.commands(), vec![NavCommand::SetSpeed(4.0)]);

        let stun = Modifier::new(ModifierKind::Stunned).with_duration(0.5);
        h.agent.add_modifier(stun);
        h.run_for(0.3);
        assert_eq!(h.agent.state(), AgentState::Idle);

        h.run_for(0.3);
        assert_eq!(h.agent.state(), AgentState::Approach);

        let slow = Modifier::new(ModifierKind::Slowed).with_magnitude(0.5);
        let slow_id = slow.id;
        h.agent.add_modifier(slow);
        assert!(h.nav.commands().contains(&NavCommand::SetSpeed(2.0)));
        assert!(h.agent.remove_modifier(slow_id));
        assert_eq!(h.nav.commands().last(), Some(&NavCommand::SetSpeed(4.0)));
    }

    #[test]
    fn test_reset_restores_health_and_route() {
        let mut h = Harness::new(AgentConfig {
            waypoints: vec![Vec3::X, Vec3::Y],
            ..AgentConfig::default()
        });
        h.agent.take_damage(40);
        h.nav.set_remaining(5.0);
        h.run_for(2.1);
        h.nav.set_remaining(0.0);
        h.tick();
        assert_eq!(h.agent.waypoint_index(), 1);

        h.agent.reset_to_initial_state();
        assert_eq!(h.agent.current_health(), 100);
        assert_eq!(h.agent.waypoint_index(), 0);
        assert_eq!(h.agent.state(), AgentState::Idle);
    }

    #[test]
    fn test_stop_all_behavior() {
        let mut h = Harness::new(AgentConfig::default()).with_player(5.0, 100);
        h.tick();
        assert_eq!(h.agent.state(), AgentState::Approach);
        h.nav.clear();

        h.agent.stop_all_behavior();
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert_eq!(h.nav.commands(), vec![NavCommand::Stop]);
    }

    proptest! {
        #[test]
        fn prop_health_stays_within_bounds(hits in proptest::collection::vec(-20i32..60, 0..20)) {
            let mut agent = AgentController::builder(EntityId::new(), AgentConfig::default())
                .navigator(RecordingNavigator::new())
                .build();
            for amount in hits {
                agent.take_damage(amount);
                let health = agent.current_health();
                prop_assert!((0..=agent.max_health()).contains(&health));
                prop_assert_eq!(agent.is_dead(), health == 0);
            }
        }
    }
}
