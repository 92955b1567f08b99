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

// PEAS - Performance, Environment, Action, Sensing
//
// See:
// -  Chapter 2: Intelligent Agents, page 40
//
// The vacuum agent here is a model-based agent rather than a reflex one. It keeps a battery, a
// planned route and a memory of where it has been, and it picks what to do next with one of a few
// strategies. Performance is measured by whatever MetricsRecorder it reports to.

use grid_world::{Cell, Direction, GridEnvironment, Location};

pub mod agent;
pub mod battery;
pub mod comparison;
pub mod config;
pub mod metrics;
pub mod path;
pub mod simulation;
pub mod strategy;

pub use agent::{AgentStatus, StepKind, StepOutcome, VacuumAgent};
pub use battery::Battery;
pub use comparison::{ComparisonConfig, RunResult, StrategyComparator, StrategySummary};
pub use config::{AgentConfig, ConfigError, SimulationConfig};
pub use metrics::{MetricsRecorder, MetricsSummary, PerformanceMetrics, StepAction, StepRecord};
pub use simulation::{Simulation, SimulationReport, StopReason};
pub use strategy::{Strategy, StrategyKind};

pub type Rng = rand_pcg::Pcg64;
pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

/// The part of the world the agent is allowed to see and touch.
///
/// Notice that the only mutation on offer is cleaning a cell. The agent borrows the Environment
/// for one step at a time and never owns it.
pub trait Environment {
    fn size(&self) -> usize;

    /// None if out of bounds.
    fn cell(&self, location: Location) -> Option<Cell>;

    /// All dirty cells, row by row.
    fn dirty_cells(&self) -> Vec<Location>;

    /// Turn a dirty cell clean. Returns whether anything changed.
    fn set_clean(&mut self, location: Location) -> bool;

    fn charger(&self) -> Location {
        Location::new(self.size() - 1, self.size() - 1)
    }

    fn is_passable(&self, location: Location) -> bool {
        matches!(self.cell(location), Some(cell) if cell != Cell::Obstacle)
    }

    fn total_cells(&self) -> usize {
        self.size() * self.size()
    }

    /// Passable 4-connected neighbors in [`Direction::ALL`] order.
    fn neighbors(&self, location: Location) -> Vec<Location> {
        Direction::ALL
            .iter()
            .filter_map(|direction| location.step(*direction))
            .filter(|next| self.is_passable(*next))
            .collect()
    }
}

impl Environment for GridEnvironment {
    fn size(&self) -> usize {
        GridEnvironment::size(self)
    }

    fn cell(&self, location: Location) -> Option<Cell> {
        self.get(location)
    }

    fn dirty_cells(&self) -> Vec<Location> {
        GridEnvironment::dirty_cells(self)
    }

    fn set_clean(&mut self, location: Location) -> bool {
        GridEnvironment::set_clean(self, location).unwrap_or(false)
    }

    fn charger(&self) -> Location {
        GridEnvironment::charger(self)
    }

    fn neighbors(&self, location: Location) -> Vec<Location> {
        GridEnvironment::neighbors(self, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_environment_charger_is_bottom_right() {
        let grid = GridEnvironment::new(6).unwrap();
        assert_eq!(Environment::charger(&grid), Location::new(5, 5));
        assert_eq!(Environment::total_cells(&grid), 36);
    }

    #[test]
    fn test_grid_environment_set_clean_out_of_bounds_is_noop() {
        let mut grid: GridEnvironment = "* .\n. C".parse().unwrap();
        assert!(!Environment::set_clean(&mut grid, Location::new(9, 9)));
        assert!(Environment::set_clean(&mut grid, Location::new(0, 0)));
        assert!(Environment::dirty_cells(&grid).is_empty());
    }

    #[test]
    fn test_obstacles_are_not_passable() {
        let grid: GridEnvironment = ". #\n. C".parse().unwrap();
        assert!(Environment::is_passable(&grid, Location::new(0, 0)));
        assert!(!Environment::is_passable(&grid, Location::new(1, 0)));
        assert!(Environment::is_passable(&grid, Location::new(1, 1)));
        assert!(!Environment::is_passable(&grid, Location::new(2, 0)));
    }
}
