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

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AgentConfig, ConfigError, SimulationConfig};
use crate::simulation::{Simulation, StopReason};
use crate::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonConfig {
    pub grid_size: usize,
    pub dirt_probability: f64,
    pub runs_per_strategy: usize,
    pub max_steps: u64,

    /// WeightedSearch is run once per epsilon here.
    pub weighted_search_epsilons: Vec<f64>,

    /// Run `k` of every variant uses seed `seed + k`, so all variants see the same grids.
    pub seed: u64,

    /// Battery and strategy parameters shared by every run. `strategy` and `epsilon` are
    /// overridden per variant.
    pub agent: AgentConfig,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            dirt_probability: 0.3,
            runs_per_strategy: 5,
            max_steps: 100,
            weighted_search_epsilons: vec![1.0, 1.5, 2.0],
            seed: 0,
            agent: AgentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub strategy: StrategyKind,
    pub epsilon: f64,
    pub seed: u64,
    pub steps: u64,
    pub dirt_cleaned: u64,
    pub efficiency: f64,
    pub coverage: f64,
    pub stop_reason: StopReason,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.stop_reason == StopReason::AllClean
    }
}

/// Aggregate over all runs of one variant. `std_steps` is the population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy: StrategyKind,
    pub epsilon: f64,
    pub runs: usize,
    pub avg_steps: f64,
    pub std_steps: f64,
    pub avg_efficiency: f64,
    pub avg_coverage: f64,
    pub success_rate: f64,
}

impl std::fmt::Display for StrategySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.strategy {
            StrategyKind::WeightedSearch => format!("{} (e={:.1})", self.strategy, self.epsilon),
            _ => self.strategy.to_string(),
        };
        write!(
            f,
            "{:<24} steps {:>6.1} +/- {:>5.1}  efficiency {:.3}  coverage {:>5.1}%  success {:>5.1}%",
            label,
            self.avg_steps,
            self.std_steps,
            self.avg_efficiency,
            self.avg_coverage,
            100.0 * self.success_rate
        )
    }
}

pub struct StrategyComparator {
    config: ComparisonConfig,
}

impl StrategyComparator {
    pub fn new(config: ComparisonConfig) -> Result<Self, ConfigError> {
        if config.runs_per_strategy == 0 {
            return Err(ConfigError::ZeroRuns);
        }
        // summaries are keyed by the clamped epsilon, so two entries must never collapse into one
        let mut seen: Vec<f64> = Vec::with_capacity(config.weighted_search_epsilons.len());
        for &epsilon in &config.weighted_search_epsilons {
            if !epsilon.is_finite() {
                return Err(ConfigError::NonFiniteEpsilon(epsilon));
            }
            let clamped = weighted_a_star::clamp_epsilon(epsilon);
            if seen.contains(&clamped) {
                return Err(ConfigError::DuplicateEpsilon(clamped));
            }
            seen.push(clamped);
        }
        // every variant shares the same grid settings
        for (strategy, epsilon) in Self::variants_of(&config) {
            Self::simulation_config(&config, strategy, epsilon, config.seed).validate()?;
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// (strategy, epsilon) pairs in output order.
    pub fn variants(&self) -> Vec<(StrategyKind, f64)> {
        Self::variants_of(&self.config)
    }

    fn variants_of(config: &ComparisonConfig) -> Vec<(StrategyKind, f64)> {
        let mut variants = vec![(StrategyKind::Random, config.agent.epsilon)];
        variants.extend(
            config
                .weighted_search_epsilons
                .iter()
                .map(|&epsilon| (StrategyKind::WeightedSearch, epsilon)),
        );
        variants.push((StrategyKind::Adaptive, config.agent.epsilon));
        variants
    }

    fn simulation_config(
        config: &ComparisonConfig,
        strategy: StrategyKind,
        epsilon: f64,
        seed: u64,
    ) -> SimulationConfig {
        SimulationConfig {
            grid_size: config.grid_size,
            dirt_probability: config.dirt_probability,
            max_steps: config.max_steps,
            seed: Some(seed),
            agent: AgentConfig {
                strategy,
                epsilon,
                ..config.agent.clone()
            },
        }
    }

    /// Every run of every variant, in variant order then run order.
    pub fn run(&self) -> Result<Vec<RunResult>, ConfigError> {
        let jobs: Vec<(StrategyKind, f64, u64)> = self
            .variants()
            .into_iter()
            .flat_map(|(strategy, epsilon)| {
                (0..self.config.runs_per_strategy as u64)
                    .map(move |run| (strategy, epsilon, run))
            })
            .collect();
        info!(
            runs = jobs.len(),
            grid_size = self.config.grid_size,
            "comparing strategies"
        );

        jobs.into_par_iter()
            .map(|(strategy, epsilon, run)| {
                let seed = self.config.seed.wrapping_add(run);
                let config = Self::simulation_config(&self.config, strategy, epsilon, seed);
                let mut simulation = Simulation::from_config(&config)?;
                let stop_reason = simulation.run();
                let report = simulation.report();
                Ok(RunResult {
                    strategy,
                    epsilon: report.epsilon,
                    seed,
                    steps: report.steps,
                    dirt_cleaned: report.metrics.dirt_cleaned,
                    efficiency: report.metrics.efficiency,
                    coverage: report.metrics.coverage_percentage,
                    stop_reason,
                })
            })
            .collect()
    }

    /// One summary per variant, in `variants()` order. Results are matched to a variant by
    /// strategy and epsilon.
    pub fn summarize(&self, results: &[RunResult]) -> Vec<StrategySummary> {
        self.variants()
            .into_iter()
            .filter_map(|(strategy, epsilon)| {
                let epsilon = weighted_a_star::clamp_epsilon(epsilon);
                let runs: Vec<&RunResult> = results
                    .iter()
                    .filter(|result| result.strategy == strategy && result.epsilon == epsilon)
                    .collect();
                summarize_runs(strategy, epsilon, &runs)
            })
            .collect()
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

fn summarize_runs(
    strategy: StrategyKind,
    epsilon: f64,
    runs: &[&RunResult],
) -> Option<StrategySummary> {
    if runs.is_empty() {
        return None;
    }
    let avg_steps = mean(runs.iter().map(|run| run.steps as f64));
    let variance = mean(runs.iter().map(|run| (run.steps as f64 - avg_steps).powi(2)));
    let successes = runs.iter().filter(|run| run.succeeded()).count();
    Some(StrategySummary {
        strategy,
        epsilon,
        runs: runs.len(),
        avg_steps,
        std_steps: variance.sqrt(),
        avg_efficiency: mean(runs.iter().map(|run| run.efficiency)),
        avg_coverage: mean(runs.iter().map(|run| run.coverage)),
        success_rate: successes as f64 / runs.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn result(strategy: StrategyKind, steps: u64, stop_reason: StopReason) -> RunResult {
        RunResult {
            strategy,
            epsilon: 1.0,
            seed: 0,
            steps,
            dirt_cleaned: 2,
            efficiency: 2.0 / steps as f64,
            coverage: 40.0,
            stop_reason,
        }
    }

    #[test]
    fn test_zero_runs_is_rejected() {
        let config = ComparisonConfig {
            runs_per_strategy: 0,
            ..ComparisonConfig::default()
        };
        assert!(matches!(
            StrategyComparator::new(config),
            Err(ConfigError::ZeroRuns)
        ));
    }

    #[test]
    fn test_epsilons_that_clamp_together_are_rejected() {
        for epsilons in [vec![1.5, 1.5], vec![0.5, 1.0], vec![1.0, 2.0, 0.0]] {
            let config = ComparisonConfig {
                weighted_search_epsilons: epsilons,
                ..ComparisonConfig::default()
            };
            assert!(matches!(
                StrategyComparator::new(config),
                Err(ConfigError::DuplicateEpsilon(epsilon)) if epsilon == 1.0 || epsilon == 1.5
            ));
        }
    }

    #[test]
    fn test_each_epsilon_summary_counts_only_its_own_runs() {
        let config = ComparisonConfig {
            weighted_search_epsilons: vec![0.5, 2.0],
            runs_per_strategy: 2,
            seed: 3,
            ..ComparisonConfig::default()
        };
        let comparator = StrategyComparator::new(config).unwrap();
        let results = comparator.run().unwrap();
        let summaries = comparator.summarize(&results);
        assert_eq!(summaries.len(), 4);
        assert!(summaries.iter().all(|summary| summary.runs == 2));
    }

    #[test]
    fn test_bad_grid_is_rejected_up_front() {
        let config = ComparisonConfig {
            grid_size: 1,
            ..ComparisonConfig::default()
        };
        assert!(matches!(
            StrategyComparator::new(config),
            Err(ConfigError::Grid(_))
        ));
    }

    #[test]
    fn test_variants_cover_every_strategy_and_epsilon() {
        let comparator = StrategyComparator::new(ComparisonConfig::default()).unwrap();
        assert_eq!(
            comparator.variants(),
            vec![
                (StrategyKind::Random, 1.0),
                (StrategyKind::WeightedSearch, 1.0),
                (StrategyKind::WeightedSearch, 1.5),
                (StrategyKind::WeightedSearch, 2.0),
                (StrategyKind::Adaptive, 1.0),
            ]
        );
    }

    #[test]
    fn test_summary_statistics() {
        let comparator = StrategyComparator::new(ComparisonConfig::default()).unwrap();
        let results = vec![
            result(StrategyKind::Adaptive, 10, StopReason::AllClean),
            result(StrategyKind::Adaptive, 20, StopReason::StepBudgetExhausted),
            result(StrategyKind::Random, 4, StopReason::AllClean),
        ];
        let summaries = comparator.summarize(&results);
        assert_eq!(summaries.len(), 2);

        let random = &summaries[0];
        assert_eq!(random.strategy, StrategyKind::Random);
        assert_eq!(random.runs, 1);
        assert_abs_diff_eq!(random.std_steps, 0.0);
        assert_abs_diff_eq!(random.success_rate, 1.0);

        let adaptive = &summaries[1];
        assert_eq!(adaptive.strategy, StrategyKind::Adaptive);
        assert_eq!(adaptive.runs, 2);
        assert_abs_diff_eq!(adaptive.avg_steps, 15.0);
        assert_abs_diff_eq!(adaptive.std_steps, 5.0);
        assert_abs_diff_eq!(adaptive.avg_efficiency, 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(adaptive.avg_coverage, 40.0);
        assert_abs_diff_eq!(adaptive.success_rate, 0.5);
    }

    #[test]
    fn test_comparison_is_reproducible() {
        let config = ComparisonConfig {
            grid_size: 6,
            runs_per_strategy: 3,
            seed: 99,
            ..ComparisonConfig::default()
        };
        let comparator = StrategyComparator::new(config).unwrap();
        let first = comparator.run().unwrap();
        let second = comparator.run().unwrap();
        assert_eq!(first.len(), 15);
        assert_eq!(first, second);

        let summaries = comparator.summarize(&first);
        assert_eq!(summaries.len(), 5);
        assert!(summaries.iter().all(|summary| summary.runs == 3));
        assert!(first.iter().all(|run| run.steps <= 100));
    }

    #[test]
    fn test_run_k_uses_the_same_grid_for_every_variant() {
        let config = ComparisonConfig {
            runs_per_strategy: 2,
            seed: 5,
            ..ComparisonConfig::default()
        };
        let comparator = StrategyComparator::new(config).unwrap();
        let results = comparator.run().unwrap();
        for run in 0..2 {
            let seeds: Vec<u64> = results
                .iter()
                .skip(run)
                .step_by(2)
                .map(|result| result.seed)
                .collect();
            assert!(seeds.iter().all(|&seed| seed == 5 + run as u64));
        }
    }
}
