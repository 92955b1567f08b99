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

use std::cell::RefCell;
use std::rc::Rc;

use grid_world::{GridEnvironment, Location};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{StepOutcome, VacuumAgent};
use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::{MetricsRecorder, MetricsSummary, PerformanceMetrics};
use crate::strategy::StrategyKind;
use crate::{Environment, Rng};

/// Why a run ended. Checked in this order before every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    AllClean,
    BatteryDepleted,
    Stalled,
    StepBudgetExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::AllClean => write!(f, "all clean"),
            StopReason::BatteryDepleted => write!(f, "battery depleted"),
            StopReason::Stalled => write!(f, "stalled"),
            StopReason::StepBudgetExhausted => write!(f, "step budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub strategy: StrategyKind,
    pub epsilon: f64,
    pub steps: u64,
    pub stop_reason: Option<StopReason>,
    pub dirt_remaining: usize,
    pub battery_remaining: u32,
    pub battery_consumed: u64,
    pub charge_cycles: u32,

    /// What the recorder saw: cleaned dirt, coverage and the efficiency ratios.
    pub metrics: MetricsSummary,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "strategy:          {} (epsilon {:.2})", self.strategy, self.epsilon)?;
        writeln!(f, "steps:             {}", self.steps)?;
        match self.stop_reason {
            Some(reason) => writeln!(f, "stopped:           {}", reason)?,
            None => writeln!(f, "stopped:           still running")?,
        }
        writeln!(f, "dirt cleaned:      {}", self.metrics.dirt_cleaned)?;
        writeln!(f, "dirt remaining:    {}", self.dirt_remaining)?;
        writeln!(f, "battery remaining: {}", self.battery_remaining)?;
        writeln!(f, "battery consumed:  {}", self.battery_consumed)?;
        writeln!(f, "charge cycles:     {}", self.charge_cycles)?;
        writeln!(f, "coverage:          {:.1}%", self.metrics.coverage_percentage)?;
        writeln!(f, "efficiency:        {:.3}", self.metrics.efficiency)?;
        write!(f, "energy efficiency: {:.1}", self.metrics.energy_efficiency)?;
        for (strategy, cleaned) in &self.metrics.cleaned_by_strategy {
            write!(f, "\ncleaned by {:<7} {}", strategy, cleaned)?;
        }
        Ok(())
    }
}

/// Drives one agent over one environment until something stops it.
pub struct Simulation<_Environment: Environment, _Recorder: MetricsRecorder = PerformanceMetrics> {
    environment: _Environment,
    agent: VacuumAgent<_Recorder>,
    max_steps: u64,
}

impl Simulation<GridEnvironment, PerformanceMetrics> {
    /// Generate the grid and the agent from one seed. The agent starts at `(0, 0)`.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(seed, "seeding simulation");
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(seed)));
        let environment = GridEnvironment::generate(
            config.grid_size,
            config.dirt_probability,
            &mut *rng.borrow_mut(),
        )?;
        let agent = VacuumAgent::new(&config.agent, Location::new(0, 0), &environment, rng)?;
        Self::new(environment, agent, config.max_steps)
    }
}

impl<_Environment: Environment, _Recorder: MetricsRecorder> Simulation<_Environment, _Recorder> {
    pub fn new(
        environment: _Environment,
        agent: VacuumAgent<_Recorder>,
        max_steps: u64,
    ) -> Result<Self, ConfigError> {
        if max_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        Ok(Self {
            environment,
            agent,
            max_steps,
        })
    }

    pub fn environment(&self) -> &_Environment {
        &self.environment
    }

    pub fn agent(&self) -> &VacuumAgent<_Recorder> {
        &self.agent
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.environment.dirty_cells().is_empty() {
            Some(StopReason::AllClean)
        } else if self.agent.battery().is_empty() {
            Some(StopReason::BatteryDepleted)
        } else if self.agent.is_stalled() {
            Some(StopReason::Stalled)
        } else if self.agent.steps_taken() >= self.max_steps {
            Some(StopReason::StepBudgetExhausted)
        } else {
            None
        }
    }

    /// One agent step, unless the run is already over.
    pub fn step_once(&mut self) -> Option<StepOutcome> {
        if self.stop_reason().is_some() {
            return None;
        }
        Some(self.agent.step(&mut self.environment))
    }

    pub fn run(&mut self) -> StopReason {
        info!(
            strategy = %self.agent.strategy(),
            epsilon = self.agent.epsilon(),
            dirt = self.environment.dirty_cells().len(),
            max_steps = self.max_steps,
            "starting simulation"
        );
        loop {
            if let Some(reason) = self.stop_reason() {
                info!(
                    %reason,
                    steps = self.agent.steps_taken(),
                    cleaned = self.agent.cleaned_count(),
                    battery = self.agent.battery().current(),
                    "simulation finished"
                );
                return reason;
            }
            self.agent.step(&mut self.environment);
        }
    }
}

impl<_Environment: Environment> Simulation<_Environment, PerformanceMetrics> {
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            strategy: self.agent.strategy().kind(),
            epsilon: self.agent.epsilon(),
            steps: self.agent.steps_taken(),
            stop_reason: self.stop_reason(),
            dirt_remaining: self.environment.dirty_cells().len(),
            battery_remaining: self.agent.battery().current(),
            battery_consumed: self.agent.battery().total_consumed(),
            charge_cycles: self.agent.battery().charge_cycles(),
            metrics: self
                .agent
                .recorder()
                .summary(self.environment.total_cells()),
        }
    }
}
