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
use std::collections::VecDeque;
use std::rc::Rc;

use grid_world::{Direction, Location};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use weighted_a_star::{WeightedAStar, MIN_EPSILON};

use crate::battery::Battery;
use crate::config::{AgentConfig, ConfigError};
use crate::metrics::{MetricsRecorder, PerformanceMetrics, StepAction, StepRecord};
use crate::path::find_path;
use crate::strategy::Strategy;
use crate::{Environment, HashSet, Rng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,

    /// The battery needs charging but there is no route to the charger. Nothing the agent can do
    /// on its own will change that, since obstacles never move.
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Moved,

    /// Nothing to do, blocked, or target unreachable.
    Stayed,

    /// Charged in place at the charger.
    Charged,

    /// Wanted the charger but can't get there.
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub position: Location,
    pub battery_level: u32,

    /// Whether this step turned a dirty cell clean.
    pub cleaned: bool,
}

// The cached route. Only recomputed when the agent wants to go somewhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    target: Location,
    remaining: VecDeque<Location>,
}

/// The decision engine. Owns its battery, borrows the environment one step at a time, and reports
/// every step to its recorder.
pub struct VacuumAgent<_Recorder: MetricsRecorder = PerformanceMetrics> {
    position: Location,
    battery: Battery,
    strategy: Strategy,
    search: WeightedAStar,
    charge_threshold: u32,
    plan: Option<Plan>,
    visited: HashSet<Location>,
    cleaned_count: u64,
    steps_taken: u64,
    status: AgentStatus,
    rng: Rc<RefCell<Rng>>,
    recorder: _Recorder,
}

impl VacuumAgent<PerformanceMetrics> {
    pub fn new<_Environment: Environment + ?Sized>(
        config: &AgentConfig,
        start: Location,
        environment: &_Environment,
        rng: Rc<RefCell<Rng>>,
    ) -> Result<Self, ConfigError> {
        Self::with_recorder(config, start, environment, rng, PerformanceMetrics::new())
    }
}

impl<_Recorder: MetricsRecorder> VacuumAgent<_Recorder> {
    pub fn with_recorder<_Environment: Environment + ?Sized>(
        config: &AgentConfig,
        start: Location,
        environment: &_Environment,
        rng: Rc<RefCell<Rng>>,
        recorder: _Recorder,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !environment.is_passable(start) {
            return Err(ConfigError::InvalidStart(start));
        }
        if config.epsilon < MIN_EPSILON {
            warn!(
                epsilon = config.epsilon,
                "epsilon below {}, clamping", MIN_EPSILON
            );
        }
        if config.charge_threshold >= config.capacity {
            warn!(
                threshold = config.charge_threshold,
                capacity = config.capacity,
                "charge threshold at or above capacity, agent will stay on the charger once there"
            );
        }

        Ok(Self {
            position: start,
            battery: config.battery()?,
            strategy: config.strategy(),
            search: WeightedAStar::new(config.epsilon),
            charge_threshold: config.charge_threshold,
            plan: None,
            visited: HashSet::default(),
            cleaned_count: 0,
            steps_taken: 0,
            status: AgentStatus::Active,
            rng,
            recorder,
        })
    }

    /// Advance one tick: move or charge, then clean wherever the agent ends up.
    pub fn step<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &mut _Environment,
    ) -> StepOutcome {
        self.steps_taken += 1;

        let kind = if self.strategy.seeks_charger()
            && self.battery.needs_charging(self.charge_threshold)
        {
            self.seek_charger(environment)
        } else {
            match self.strategy {
                Strategy::Random => self.random_step(environment),
                Strategy::WeightedSearch => self.weighted_search_step(environment),
                Strategy::Adaptive {
                    conservation_threshold,
                    radius,
                } => {
                    if self.battery.current() < conservation_threshold {
                        self.conserve_step(environment, radius)
                    } else {
                        self.weighted_search_step(environment)
                    }
                }
            }
        };

        // charging already reported itself
        if kind != StepKind::Charged {
            self.emit_step(StepAction::Move);
        }
        let cleaned = self.clean(environment);

        debug!(
            step = self.steps_taken,
            position = %self.position,
            battery = self.battery.current(),
            ?kind,
            cleaned,
            "agent step"
        );

        StepOutcome {
            kind,
            position: self.position,
            battery_level: self.battery.current(),
            cleaned,
        }
    }

    fn seek_charger<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &_Environment,
    ) -> StepKind {
        let charger = environment.charger();
        if self.position == charger {
            self.battery.charge();
            self.status = AgentStatus::Active;
            self.emit_step(StepAction::Charging);
            return StepKind::Charged;
        }

        if self.plan_target() != Some(charger) {
            self.plan_to(environment, charger);
        }
        if self.advance(environment) {
            self.status = AgentStatus::Active;
            StepKind::Moved
        } else {
            if self.status != AgentStatus::Stalled {
                warn!(
                    position = %self.position,
                    battery = self.battery.current(),
                    "charger is unreachable, agent stalled"
                );
            }
            self.status = AgentStatus::Stalled;
            StepKind::Stalled
        }
    }

    // One of the four directions, uniformly. A move off the grid or into an obstacle is simply
    // lost; there is no second try within the same step.
    fn random_step<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &_Environment,
    ) -> StepKind {
        let index = self.rng.borrow_mut().gen_range(0..Direction::ALL.len());
        let next = self
            .position
            .step(Direction::ALL[index])
            .filter(|next| environment.is_passable(*next));
        match next {
            Some(next) => {
                self.position = next;
                self.battery.consume();
                StepKind::Moved
            }
            None => StepKind::Stayed,
        }
    }

    fn weighted_search_step<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &_Environment,
    ) -> StepKind {
        if !self.has_pending_path() {
            match self.nearest_dirt(environment) {
                Some(target) => self.plan_to(environment, target),
                None => {
                    self.plan = None;
                    return StepKind::Stayed;
                }
            }
        }
        if self.advance(environment) {
            StepKind::Moved
        } else {
            StepKind::Stayed
        }
    }

    // Low on power but not low enough to go charge: only chase dirt close by.
    fn conserve_step<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &_Environment,
        radius: usize,
    ) -> StepKind {
        let Some(&nearest) = self.nearby_dirt(environment, radius).first() else {
            return StepKind::Stayed;
        };
        if self.plan_target() != Some(nearest) {
            self.plan_to(environment, nearest);
        }
        if self.advance(environment) {
            StepKind::Moved
        } else {
            StepKind::Stayed
        }
    }

    fn clean<_Environment: Environment + ?Sized>(&mut self, environment: &mut _Environment) -> bool {
        let cleaned = environment.set_clean(self.position);
        if cleaned {
            self.cleaned_count += 1;
            self.recorder.record_cleaning(self.strategy.kind());
        }
        self.visited.insert(self.position);
        cleaned
    }

    fn emit_step(&mut self, action: StepAction) {
        self.recorder.record_step(StepRecord {
            step_index: self.steps_taken,
            position: self.position,
            battery_level: self.battery.current(),
            action,
            strategy: self.strategy.kind(),
        });
    }

    fn plan_to<_Environment: Environment + ?Sized>(
        &mut self,
        environment: &_Environment,
        target: Location,
    ) {
        let result = find_path(environment, &self.search, self.position, target);
        debug!(
            from = %self.position,
            to = %target,
            length = result.path.len(),
            expansions = result.expansions,
            reachable = result.is_reachable(),
            "planned path"
        );
        self.plan = Some(Plan {
            target,
            remaining: result.path.into(),
        });
    }

    // Take the next cell of the plan, if there is one.
    fn advance<_Environment: Environment + ?Sized>(&mut self, environment: &_Environment) -> bool {
        let next = match self.plan.as_mut().and_then(|plan| plan.remaining.pop_front()) {
            Some(next) => next,
            None => return false,
        };
        debug_assert!(environment.is_passable(next));
        self.position = next;
        self.battery.consume();
        true
    }

    fn has_pending_path(&self) -> bool {
        self.plan
            .as_ref()
            .map_or(false, |plan| !plan.remaining.is_empty())
    }

    // First minimum in row-major order wins ties.
    fn nearest_dirt<_Environment: Environment + ?Sized>(
        &self,
        environment: &_Environment,
    ) -> Option<Location> {
        environment
            .dirty_cells()
            .into_iter()
            .min_by_key(|dirt| dirt.manhattan_distance(&self.position))
    }

    // Dirty cells within Chebyshev distance `radius`, closest (Manhattan) first, row-major on ties.
    fn nearby_dirt<_Environment: Environment + ?Sized>(
        &self,
        environment: &_Environment,
        radius: usize,
    ) -> Vec<Location> {
        let mut nearby: Vec<Location> = environment
            .dirty_cells()
            .into_iter()
            .filter(|dirt| dirt.chebyshev_distance(&self.position) <= radius)
            .collect();
        nearby.sort_by_key(|dirt| dirt.manhattan_distance(&self.position));
        nearby
    }

    pub fn position(&self) -> Location {
        self.position
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn epsilon(&self) -> f64 {
        self.search.epsilon()
    }

    /// Retune the search at runtime. Values below 1.0 are clamped. Takes effect at the next plan.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        if epsilon < MIN_EPSILON {
            warn!(epsilon, "epsilon below {}, clamping", MIN_EPSILON);
        }
        self.search.set_epsilon(epsilon);
    }

    pub fn cleaned_count(&self) -> u64 {
        self.cleaned_count
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn visited(&self) -> &HashSet<Location> {
        &self.visited
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn is_stalled(&self) -> bool {
        self.status == AgentStatus::Stalled
    }

    /// Where the cached plan leads, if there is one.
    pub fn plan_target(&self) -> Option<Location> {
        self.plan.as_ref().map(|plan| plan.target)
    }

    pub fn recorder(&self) -> &_Recorder {
        &self.recorder
    }
}
