//! Agent tunables and archetype files.
//!
//! Configuration is plain TOML. Every field has a default, so a file only
//! lists what differs:
//!
//! ```toml
//! [[agents]]
//! name = "gate-guard"
//! spawn = [0.0, 0.0, 0.0]
//! detection_radius = 12.0
//! waypoints = [[0.0, 0.0, 0.0], [8.0, 0.0, 0.0]]
//!
//! [[agents.loot]]
//! item = 3
//! chance = 0.25
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use sentinel_common::SentinelError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::combat::DEFAULT_ATTACK_DAMAGE;
use crate::loot::LootTable;
use crate::state::Disposition;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error.
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for SentinelError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ReadError(io) => Self::Io(io),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Per-agent tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Starting disposition
    pub disposition: Disposition,
    /// Target sensed (and kept) inside this radius
    pub detection_radius: f32,
    /// Reserved; no transition reads it
    pub approach_radius: f32,
    /// Attack starts inside this radius
    pub attack_radius: f32,
    /// Seconds between resolved attacks
    pub attack_cooldown: f32,
    /// Damage per resolved attack
    pub attack_damage: i32,
    /// Health the status container starts with
    pub max_health: i32,
    /// Movement speed forwarded to navigation
    pub move_speed: f32,
    /// Idle time before patrolling starts
    pub idle_patrol_delay: f32,
    /// Recovery time after a strike
    pub wait_duration: f32,
    /// Grace period between death and removal
    pub despawn_delay: f32,
    /// Waypoint counts as reached within this distance
    pub arrival_tolerance: f32,
    /// Whether the patrol route loops
    pub patrol_loop: bool,
    /// Patrol waypoints
    pub waypoints: Vec<Vec3>,
    /// Drops rolled on death
    pub loot: LootTable,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            disposition: Disposition::Hostile,
            detection_radius: 10.0,
            approach_radius: 6.0,
            attack_radius: 2.0,
            attack_cooldown: 1.5,
            attack_damage: DEFAULT_ATTACK_DAMAGE,
            max_health: 100,
            move_speed: 3.5,
            idle_patrol_delay: 2.0,
            wait_duration: 1.0,
            despawn_delay: 3.0,
            arrival_tolerance: 0.5,
            patrol_loop: true,
            waypoints: Vec::new(),
            loot: LootTable::default(),
        }
    }
}

impl AgentConfig {
    /// Checks ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        let tunables = [
            ("detection_radius", self.detection_radius),
            ("approach_radius", self.approach_radius),
            ("attack_radius", self.attack_radius),
            ("attack_cooldown", self.attack_cooldown),
            ("move_speed", self.move_speed),
            ("idle_patrol_delay", self.idle_patrol_delay),
            ("wait_duration", self.wait_duration),
            ("despawn_delay", self.despawn_delay),
            ("arrival_tolerance", self.arrival_tolerance),
        ];
        for (name, value) in tunables {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a finite value >= 0, got {value}"
                )));
            }
        }

        if self.attack_damage < 0 {
            return Err(ConfigError::ValidationError(format!(
                "attack_damage must be >= 0, got {}",
                self.attack_damage
            )));
        }
        if self.max_health <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "max_health must be > 0, got {}",
                self.max_health
            )));
        }
        if let Some(bad) = self
            .loot
            .entries()
            .iter()
            .find(|e| !(0.0..=1.0).contains(&e.chance))
        {
            return Err(ConfigError::ValidationError(format!(
                "loot chance for item {} must be within [0, 1], got {}",
                bad.item.raw(),
                bad.chance
            )));
        }
        if self.waypoints.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::ValidationError(
                "waypoints must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a single agent table.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a single agent table from a TOML file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded agent config from {:?}", path);
        Ok(config)
    }
}

/// One named agent to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentArchetype {
    /// Display name used in logs.
    pub name: String,
    /// Spawn position.
    #[serde(default)]
    pub spawn: Vec3,
    /// Tunables.
    #[serde(flatten)]
    pub config: AgentConfig,
}

/// A file listing agents to spawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeFile {
    /// Agents in spawn order.
    #[serde(default)]
    pub agents: Vec<AgentArchetype>,
}

impl ArchetypeFile {
    /// Parses and validates every archetype.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let file: Self = toml::from_str(content)?;
        for archetype in &file.agents {
            archetype.config.validate().map_err(|e| {
                ConfigError::ValidationError(format!("agent '{}': {e}", archetype.name))
            })?;
        }
        Ok(file)
    }

    /// Loads archetypes from a TOML file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let file = Self::from_toml_str(&content)?;
        for archetype in &file.agents {
            debug!(
                "Archetype '{}' at {:?} ({} waypoints)",
                archetype.name,
                archetype.spawn,
                archetype.config.waypoints.len()
            );
        }
        info!("Loaded {} agent archetypes from {:?}", file.agents.len(), path);
        Ok(file)
    }
}
