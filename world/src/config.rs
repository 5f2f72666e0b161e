//! Session configuration.

use std::time::Duration;

use detour_defence_core::Waypoint;
use detour_defence_system_navigation::{Heuristic, Pathfinder, SoftCosts};
use detour_defence_system_movement::AgentStats;
use detour_defence_system_tower_combat::TowerSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable parameters of a play session.
///
/// Every field has a default, so partial TOML tables deserialize cleanly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of grid columns.
    pub width: u32,
    /// Number of grid rows.
    pub height: u32,
    /// Side length of a cell in world units.
    pub cell_size: f64,
    /// Designer route agents spawn on, in cell units.
    pub route: Vec<Waypoint>,
    /// Agents spawned per wave.
    pub wave_size: u32,
    /// Starting health of an agent.
    pub agent_health: u32,
    /// Agent speed in cells per millisecond.
    pub agent_speed: f64,
    /// Currency granted per defeated agent.
    pub agent_reward: u32,
    /// Money available at session start.
    pub starting_money: u32,
    /// Lives available at session start.
    pub starting_lives: u32,
    /// Price of a tower.
    pub tower_cost: u32,
    /// Tower firing radius in world units.
    pub tower_range: f64,
    /// Minimum milliseconds between two shots of the same tower.
    pub tower_firing_rate_ms: u64,
    /// Projectile speed in world units per millisecond.
    pub projectile_speed: f64,
    /// Damage dealt per projectile.
    pub projectile_damage: u32,
    /// Number of waves that must be cleared to win; endless when absent.
    pub waves_to_win: Option<u32>,
    /// Agents restart their route instead of leaking.
    pub looping_agents: bool,
    /// Heuristic used by the pathfinder.
    pub heuristic: Heuristic,
    /// Planning penalty per neighbouring obstacle.
    pub wall_penalty: f64,
    /// Planning penalty per neighbouring agent.
    pub crowd_penalty: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 40,
            height: 30,
            cell_size: 20.0,
            route: vec![
                Waypoint::new(15.0, 0.0),
                Waypoint::new(13.0, 23.0),
                Waypoint::new(25.0, 25.0),
            ],
            wave_size: 20,
            agent_health: 100,
            agent_speed: 0.01,
            agent_reward: 1,
            starting_money: 15,
            starting_lives: 50,
            tower_cost: 5,
            tower_range: 200.0,
            tower_firing_rate_ms: 1000,
            projectile_speed: 0.7,
            projectile_damage: 10,
            waves_to_win: None,
            looping_agents: false,
            heuristic: Heuristic::Manhattan,
            wall_penalty: 2.0,
            crowd_penalty: 3.0,
        }
    }
}

impl Config {
    /// Checks that the configuration describes a playable session.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if self.wave_size == 0 {
            return Err(ConfigError::EmptyWave);
        }
        if !(self.cell_size > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "cell_size",
                value: self.cell_size,
            });
        }
        if !(self.agent_speed > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "agent_speed",
                value: self.agent_speed,
            });
        }
        if !(self.projectile_speed > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "projectile_speed",
                value: self.projectile_speed,
            });
        }
        for (field, value) in [
            ("wall_penalty", self.wall_penalty),
            ("crowd_penalty", self.crowd_penalty),
            ("tower_range", self.tower_range),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }

    pub(crate) fn agent_stats(&self) -> AgentStats {
        AgentStats {
            health: self.agent_health,
            speed: self.agent_speed,
            reward: self.agent_reward,
        }
    }

    pub(crate) fn tower_spec(&self) -> TowerSpec {
        TowerSpec {
            range: self.tower_range,
            firing_rate: Duration::from_millis(self.tower_firing_rate_ms),
            projectile_speed: self.projectile_speed,
            projectile_damage: self.projectile_damage,
        }
    }

    pub(crate) fn pathfinder(&self) -> Pathfinder {
        Pathfinder::new(self.width, self.height)
            .with_heuristic(self.heuristic)
            .with_soft_costs(SoftCosts::new(self.wall_penalty, self.crowd_penalty))
    }
}

/// Reasons a [`Config`] cannot start a session.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid must have at least one cell, got {width}x{height}")]
    EmptyGrid {
        /// Configured column count.
        width: u32,
        /// Configured row count.
        height: u32,
    },
    /// Waves would spawn no agents and could never be cleared.
    #[error("wave_size must be at least 1")]
    EmptyWave,
    /// A field that must be strictly positive is not.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: f64,
    },
    /// A field that must not be negative is.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: f64,
    },
}
