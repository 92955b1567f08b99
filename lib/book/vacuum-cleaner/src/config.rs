/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

use grid_world::{GridError, Location};
use serde::{Deserialize, Serialize};

use crate::battery::{
    Battery, DEFAULT_CAPACITY, DEFAULT_CHARGE_RATE, DEFAULT_CHARGE_THRESHOLD, DEFAULT_DRAIN_RATE,
};
use crate::strategy::{
    Strategy, StrategyKind, DEFAULT_CONSERVATION_RADIUS, DEFAULT_CONSERVATION_THRESHOLD,
};

/// Configuration error. Raised when building a battery, agent or simulation, never mid-run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("battery capacity must be positive")]
    ZeroCapacity,

    #[error("battery drain rate must be positive")]
    ZeroDrainRate,

    #[error("battery charge rate must be positive")]
    ZeroChargeRate,

    #[error("initial charge {initial} exceeds battery capacity {capacity}")]
    InitialChargeExceedsCapacity { initial: u32, capacity: u32 },

    #[error("epsilon must be a finite number, got {0}")]
    NonFiniteEpsilon(f64),

    #[error("epsilon {0} appears more than once after clamping")]
    DuplicateEpsilon(f64),

    #[error("conservation radius must be positive")]
    ZeroConservationRadius,

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("start position {0} is outside the grid or on an obstacle")]
    InvalidStart(Location),

    #[error("step budget must be positive")]
    ZeroStepBudget,

    #[error("at least one run per strategy is required")]
    ZeroRuns,

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("invalid json config: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e.to_string())
    }
}

/// Agent and battery settings. Every field has a default, so a config file only needs the fields
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub capacity: u32,
    pub drain_rate: u32,
    pub charge_rate: u32,

    /// Starting battery level. None means full.
    pub initial_charge: Option<u32>,

    pub strategy: StrategyKind,

    /// Weighted A* greediness. Values below 1.0 are clamped to 1.0.
    pub epsilon: f64,

    /// At or below this level the agent heads for the charger. At or above capacity the agent
    /// never leaves the charger once it gets there.
    pub charge_threshold: u32,

    /// Adaptive only: below this level only nearby dirt is chased.
    pub conservation_threshold: u32,

    /// Adaptive only: box radius for nearby dirt.
    pub conservation_radius: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drain_rate: DEFAULT_DRAIN_RATE,
            charge_rate: DEFAULT_CHARGE_RATE,
            initial_charge: None,
            strategy: StrategyKind::default(),
            epsilon: 1.0,
            charge_threshold: DEFAULT_CHARGE_THRESHOLD,
            conservation_threshold: DEFAULT_CONSERVATION_THRESHOLD,
            conservation_radius: DEFAULT_CONSERVATION_RADIUS,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.battery()?;
        if !self.epsilon.is_finite() {
            return Err(ConfigError::NonFiniteEpsilon(self.epsilon));
        }
        if self.conservation_radius == 0 {
            return Err(ConfigError::ZeroConservationRadius);
        }
        Ok(())
    }

    pub fn battery(&self) -> Result<Battery, ConfigError> {
        let battery = Battery::new(self.capacity, self.drain_rate, self.charge_rate)?;
        match self.initial_charge {
            Some(level) => battery.with_level(level),
            None => Ok(battery),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::Random => Strategy::Random,
            StrategyKind::WeightedSearch => Strategy::WeightedSearch,
            StrategyKind::Adaptive => Strategy::Adaptive {
                conservation_threshold: self.conservation_threshold,
                radius: self.conservation_radius,
            },
        }
    }
}

/// One simulation run: the generated grid, the step budget and the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub grid_size: usize,
    pub dirt_probability: f64,
    pub max_steps: u64,

    /// None picks a fresh random seed.
    pub seed: Option<u64>,

    pub agent: AgentConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            dirt_probability: 0.3,
            max_steps: 100,
            seed: None,
            agent: AgentConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < grid_world::MIN_SIZE {
            return Err(GridError::InvalidSize(self.grid_size).into());
        }
        if !(0.0..=1.0).contains(&self.dirt_probability) {
            return Err(GridError::InvalidDirtProbability(self.dirt_probability).into());
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        self.agent.validate()
    }
}
