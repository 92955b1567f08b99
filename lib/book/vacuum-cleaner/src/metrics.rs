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

use grid_world::Location;
use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;
use crate::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Move,
    Charging,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Move => write!(f, "move"),
            StepAction::Charging => write!(f, "charging"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based, counts every call to step.
    pub step_index: u64,
    pub position: Location,
    pub battery_level: u32,
    pub action: StepAction,
    pub strategy: StrategyKind,
}

/// Receives what the agent does. Recorders aggregate however they like; nothing flows back to the
/// agent.
pub trait MetricsRecorder {
    fn record_step(&mut self, record: StepRecord);
    fn record_cleaning(&mut self, strategy: StrategyKind);
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    steps_taken: u64,
    dirt_cleaned: u64,
    cells_visited: HashSet<Location>,
    battery_usage: Vec<u32>,
    decisions: Vec<StepRecord>,
    cleaned_by_strategy: HashMap<StrategyKind, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_steps: u64,
    pub dirt_cleaned: u64,
    pub coverage_percentage: f64,
    pub efficiency: f64,
    pub energy_efficiency: f64,
    pub cleaned_by_strategy: Vec<(StrategyKind, u64)>,
}

impl MetricsRecorder for PerformanceMetrics {
    fn record_step(&mut self, record: StepRecord) {
        self.steps_taken += 1;
        self.cells_visited.insert(record.position);
        self.battery_usage.push(record.battery_level);
        self.decisions.push(record);
    }

    fn record_cleaning(&mut self, strategy: StrategyKind) {
        self.dirt_cleaned += 1;
        *self.cleaned_by_strategy.entry(strategy).or_insert(0) += 1;
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn dirt_cleaned(&self) -> u64 {
        self.dirt_cleaned
    }

    pub fn cells_visited(&self) -> &HashSet<Location> {
        &self.cells_visited
    }

    pub fn battery_usage(&self) -> &[u32] {
        &self.battery_usage
    }

    pub fn decisions(&self) -> &[StepRecord] {
        &self.decisions
    }

    pub fn cleaned_by(&self, strategy: StrategyKind) -> u64 {
        self.cleaned_by_strategy.get(&strategy).copied().unwrap_or(0)
    }

    /// Percentage of the grid's cells that showed up in a step record.
    pub fn coverage(&self, total_cells: usize) -> f64 {
        if total_cells == 0 {
            return 0.0;
        }
        100.0 * self.cells_visited.len() as f64 / total_cells as f64
    }

    /// Dirt cleaned per step.
    pub fn efficiency(&self) -> f64 {
        if self.steps_taken == 0 {
            return 0.0;
        }
        self.dirt_cleaned as f64 / self.steps_taken as f64
    }

    /// Sum of recorded battery levels per dirt cleaned.
    pub fn energy_efficiency(&self) -> f64 {
        if self.dirt_cleaned == 0 {
            return 0.0;
        }
        let total: u64 = self.battery_usage.iter().map(|&level| u64::from(level)).sum();
        total as f64 / self.dirt_cleaned as f64
    }

    pub fn summary(&self, total_cells: usize) -> MetricsSummary {
        let mut cleaned_by_strategy: Vec<(StrategyKind, u64)> = self
            .cleaned_by_strategy
            .iter()
            .map(|(strategy, count)| (*strategy, *count))
            .collect();
        cleaned_by_strategy.sort_unstable();
        MetricsSummary {
            total_steps: self.steps_taken,
            dirt_cleaned: self.dirt_cleaned,
            coverage_percentage: self.coverage(total_cells),
            efficiency: self.efficiency(),
            energy_efficiency: self.energy_efficiency(),
            cleaned_by_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn record(step_index: u64, x: usize, y: usize, battery_level: u32) -> StepRecord {
        StepRecord {
            step_index,
            position: Location::new(x, y),
            battery_level,
            action: StepAction::Move,
            strategy: StrategyKind::WeightedSearch,
        }
    }

    #[test]
    fn test_empty_metrics_have_zero_ratios() {
        let metrics = PerformanceMetrics::new();
        assert_abs_diff_eq!(metrics.efficiency(), 0.0);
        assert_abs_diff_eq!(metrics.energy_efficiency(), 0.0);
        assert_abs_diff_eq!(metrics.coverage(25), 0.0);
    }

    #[test]
    fn test_steps_and_cleaning_are_aggregated() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_step(record(1, 0, 1, 99));
        metrics.record_step(record(2, 0, 2, 98));
        metrics.record_cleaning(StrategyKind::WeightedSearch);
        metrics.record_step(record(3, 0, 1, 97));

        assert_eq!(metrics.steps_taken(), 3);
        assert_eq!(metrics.dirt_cleaned(), 1);
        assert_eq!(metrics.cells_visited().len(), 2);
        assert_eq!(metrics.battery_usage(), &[99, 98, 97]);
        assert_eq!(metrics.cleaned_by(StrategyKind::WeightedSearch), 1);
        assert_eq!(metrics.cleaned_by(StrategyKind::Random), 0);
        assert_abs_diff_eq!(metrics.coverage(25), 8.0);
        assert_abs_diff_eq!(metrics.efficiency(), 1.0 / 3.0);
        assert_abs_diff_eq!(metrics.energy_efficiency(), 294.0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_step(record(1, 1, 0, 50));
        metrics.record_cleaning(StrategyKind::Adaptive);
        metrics.record_cleaning(StrategyKind::Random);
        let summary = metrics.summary(4);
        assert_eq!(summary.total_steps, 1);
        assert_eq!(summary.dirt_cleaned, 2);
        assert_abs_diff_eq!(summary.coverage_percentage, 25.0);
        assert_eq!(
            summary.cleaned_by_strategy,
            vec![(StrategyKind::Random, 1), (StrategyKind::Adaptive, 1)]
        );
    }

    #[test]
    fn test_step_action_labels() {
        assert_eq!(StepAction::Move.to_string(), "move");
        assert_eq!(StepAction::Charging.to_string(), "charging");
        assert_eq!(
            serde_json::to_string(&StepAction::Charging).unwrap(),
            "\"charging\""
        );
    }
}
