//! Scripted encounters: a player body walks into a group of agents and
//! trades blows with them on a fixed timestep.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::Vec3;
use sentinel_ai::prelude::*;
use sentinel_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Encounter used when no scenario file is given.
pub const DEFAULT_SCENARIO: &str = r#"
[sim]
duration = 30.0
fixed_dt = 0.016666668

[sim.player]
start = [-12.0, 0.0, 0.0]
speed = 2.5
max_health = 250
damage = 15
attack_interval = 0.8
reach = 2.0

[[obstacles]]
center = [0.0, 0.0, 6.0]
radius = 1.5

[[agents]]
name = "gate-guard"
spawn = [0.0, 0.0, 0.0]
detection_radius = 9.0
waypoints = [[0.0, 0.0, 0.0], [0.0, 0.0, 8.0], [6.0, 0.0, 8.0]]

[[agents.loot]]
item = 1
chance = 0.5

[[agents.loot]]
item = 2
chance = 0.1

[[agents]]
name = "watchman"
spawn = [8.0, 0.0, -4.0]
disposition = "neutral"
max_health = 60
patrol_loop = false
waypoints = [[8.0, 0.0, -4.0], [8.0, 0.0, 4.0]]
"#;

/// Player avatar tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Starting position
    pub start: Vec3,
    /// Walking speed
    pub speed: f32,
    /// Starting health
    pub max_health: i32,
    /// Damage per swing
    pub damage: i32,
    /// Seconds between swings
    pub attack_interval: f32,
    /// Swing reach
    pub reach: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            start: Vec3::new(-12.0, 0.0, 0.0),
            speed: 2.5,
            max_health: 250,
            damage: 15,
            attack_interval: 0.8,
            reach: 2.0,
        }
    }
}

/// Loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Simulated seconds
    pub duration: f32,
    /// Fixed timestep
    pub fixed_dt: f32,
    /// Loot roll seed base; each agent adds its spawn index
    pub seed: u64,
    /// Player avatar
    pub player: PlayerSettings,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            duration: 30.0,
            fixed_dt: 1.0 / 60.0,
            seed: 0x5e17,
            player: PlayerSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScenarioTables {
    #[serde(default)]
    sim: SimSettings,
    #[serde(default)]
    obstacles: Vec<Occluder>,
}

/// A loaded encounter.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Loop settings
    pub settings: SimSettings,
    /// Sight blockers
    pub obstacles: Vec<Occluder>,
    /// Agents to spawn
    pub archetypes: ArchetypeFile,
}

impl Scenario {
    /// Parses a scenario.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tables: ScenarioTables = toml::from_str(content).context("invalid scenario tables")?;
        let archetypes = ArchetypeFile::from_toml_str(content).context("invalid agent archetypes")?;

        let settings = tables.sim;
        if !(settings.fixed_dt.is_finite() && settings.fixed_dt > 0.0) {
            bail!("fixed_dt must be > 0, got {}", settings.fixed_dt);
        }
        if !(settings.duration.is_finite() && settings.duration >= 0.0) {
            bail!("duration must be >= 0, got {}", settings.duration);
        }

        Ok(Self {
            settings,
            obstacles: tables.obstacles,
            archetypes,
        })
    }

    /// The built-in encounter.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_SCENARIO)
    }

    /// Loads a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = Self::from_toml_str(&content)?;
        info!(
            "Loaded scenario {} ({} agents, {} obstacles)",
            path.display(),
            scenario.archetypes.agents.len(),
            scenario.obstacles.len()
        );
        Ok(scenario)
    }
}

/// Event handler that narrates the encounter.
#[derive(Debug, Default)]
pub struct Narrator {
    /// Agents that died
    pub deaths: usize,
    /// Attacks that landed on anything
    pub attacks: usize,
    /// Items dropped
    pub drops: usize,
    /// Faults reported
    pub faults: usize,
}

impl EventHandler for Narrator {
    fn handle(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::StateChanged { agent, from, to } => {
                debug!("{agent}: {from} -> {to}");
            },
            AgentEvent::TargetDetected { agent, target } => {
                info!("{agent} spotted {target}");
            },
            AgentEvent::TargetLost { agent } => info!("{agent} lost its target"),
            AgentEvent::AttackResolved {
                agent,
                target,
                damage,
            } => {
                self.attacks += 1;
                info!("{agent} hit {target} for {damage}");
            },
            AgentEvent::HealthChanged { agent, current, max } => {
                debug!("{agent} health {current}/{max}");
            },
            AgentEvent::Death { agent } => {
                self.deaths += 1;
                info!("{agent} died");
            },
            AgentEvent::LootDropped {
                agent,
                item,
                position,
            } => {
                self.drops += 1;
                info!("{agent} dropped item {} at {position:?}", item.raw());
            },
            AgentEvent::Removed { agent } => debug!("{agent} despawned"),
            AgentEvent::Fault { agent, fault } => {
                self.faults += 1;
                warn!("{agent} fault: {fault}");
            },
        }
    }
}

/// How an encounter ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Simulated seconds
    pub elapsed: f32,
    /// Fixed steps run
    pub ticks: u64,
    /// Player health at the end
    pub player_health: i32,
    /// Agents still present
    pub agents_left: usize,
    /// Agents that died
    pub deaths: usize,
    /// Attacks resolved by agents
    pub attacks: usize,
    /// Items dropped
    pub drops: usize,
}

struct Player {
    id: EntityId,
    speed: f32,
    damage: i32,
    attack_interval: f32,
    reach: f32,
    cooldown: f32,
}

impl Player {
    fn nearest_agent(registry: &AgentRegistry, from: Vec3) -> Option<(EntityId, Vec3)> {
        registry
            .agent_ids()
            .into_iter()
            .filter(|id| registry.get(*id).is_some_and(|a| !a.is_dead()))
            .filter_map(|id| registry.position(id).map(|p| (id, p)))
            .min_by(|a, b| from.distance(a.1).total_cmp(&from.distance(b.1)))
    }

    /// Walks toward the closest living agent and swings when in reach.
    fn act(&mut self, registry: &mut AgentRegistry, dt: f32) -> Result<()> {
        self.cooldown = (self.cooldown - dt).max(0.0);
        let Some(position) = registry.position(self.id) else {
            return Ok(());
        };
        let Some((target, target_position)) = Self::nearest_agent(registry, position) else {
            return Ok(());
        };

        let offset = target_position - position;
        let distance = offset.length();
        if distance > self.reach {
            let step = (self.speed * dt).min(distance - self.reach);
            registry.set_position(self.id, position + offset / distance * step)?;
        } else if self.cooldown <= 0.0 {
            registry.damage(target, self.damage)?;
            self.cooldown = self.attack_interval;
            debug!("Player swung at {target}");
        }
        Ok(())
    }
}

/// Runs an encounter to completion.
pub fn run(scenario: &Scenario) -> Result<Summary> {
    let settings = &scenario.settings;
    let sight = scenario
        .obstacles
        .iter()
        .fold(Occluders::new(), |sight, o| sight.with(o.center, o.radius));
    let mut registry = AgentRegistry::new(sight);

    let mut player = Player {
        id: EntityId::new(),
        speed: settings.player.speed,
        damage: settings.player.damage,
        attack_interval: settings.player.attack_interval,
        reach: settings.player.reach,
        cooldown: 0.0,
    };
    registry.add_combatant(
        player.id,
        Dummy::new(settings.player.max_health),
        settings.player.start,
    )?;

    for (index, archetype) in scenario.archetypes.agents.iter().enumerate() {
        let agent = AgentController::builder(EntityId::new(), archetype.config.clone())
            .navigator(StraightLineNavigator::new(
                archetype.spawn,
                archetype.config.move_speed,
            ))
            .position(archetype.spawn)
            .target(player.id)
            .seed(settings.seed + index as u64)
            .build();
        info!("Spawning '{}' as {}", archetype.name, agent.id());
        registry.spawn(agent, archetype.spawn)?;
    }

    let mut narrator = Narrator::default();
    let mut ticks = 0u64;
    while registry.now() < settings.duration {
        player.act(&mut registry, settings.fixed_dt)?;
        registry.tick(settings.fixed_dt);
        ticks += 1;

        let mut handlers: [&mut dyn EventHandler; 1] = [&mut narrator];
        registry.dispatch(&mut handlers);

        if registry.is_empty() {
            info!("All agents gone after {:.2}s", registry.now());
            break;
        }
        if registry.combatant(player.id).is_some_and(|p| p.is_dead()) {
            info!("Player fell after {:.2}s", registry.now());
            break;
        }
    }

    Ok(Summary {
        elapsed: registry.now(),
        ticks,
        player_health: registry
            .combatant(player.id)
            .map_or(0, |p| p.current_health()),
        agents_left: registry.len(),
        deaths: narrator.deaths,
        attacks: narrator.attacks,
        drops: narrator.drops,
    })
}
