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

//! Battery-aware vacuum agent simulator.
//!
//! Commands:
//! - run: one simulation on a generated grid, printing the final grid and a report
//! - compare: every strategy over several seeded grids, one summary line per strategy

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vacuum_cleaner::{
    ComparisonConfig, Simulation, SimulationConfig, StrategyComparator, StrategyKind,
};

#[derive(Parser)]
#[command(name = "vacuum-sim")]
#[command(version)]
#[command(about = "Battery-aware vacuum cleaner agent on a grid")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run(RunArgs),

    /// Compare all strategies over several seeded grids
    Compare(CompareArgs),
}

/// Command line values override the config file, which overrides the defaults.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// JSON simulation config
    #[arg(long)]
    config: Option<PathBuf>,

    /// random, weighted-search (astar) or adaptive (optimized)
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Weighted A* epsilon, at least 1.0
    #[arg(long)]
    epsilon: Option<f64>,

    /// Grid size
    #[arg(long)]
    size: Option<usize>,

    /// Chance that a cell starts dirty
    #[arg(long)]
    dirt_probability: Option<f64>,

    /// Step budget
    #[arg(long)]
    max_steps: Option<u64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Runs per strategy
    #[arg(long, default_value = "5")]
    runs: usize,

    /// Grid size
    #[arg(long, default_value = "5")]
    size: usize,

    /// Chance that a cell starts dirty
    #[arg(long, default_value = "0.3")]
    dirt_probability: f64,

    /// Step budget per run
    #[arg(long, default_value = "100")]
    max_steps: u64,

    /// Base seed, run k uses seed + k
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Print the summaries as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SimulationConfig::from_json_str(&contents)
                .with_context(|| format!("invalid config {}", path.display()))
        }
        None => Ok(SimulationConfig::default()),
    }
}

fn apply_overrides(mut config: SimulationConfig, args: &RunArgs) -> Result<SimulationConfig> {
    if let Some(strategy) = args.strategy {
        config.agent.strategy = strategy;
    }
    if let Some(epsilon) = args.epsilon {
        config.agent.epsilon = epsilon;
    }
    if let Some(size) = args.size {
        config.grid_size = size;
    }
    if let Some(dirt_probability) = args.dirt_probability {
        config.dirt_probability = dirt_probability;
    }
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = apply_overrides(load_config(args.config.as_deref())?, &args)?;
    let mut simulation = Simulation::from_config(&config)?;
    println!("{}\n", simulation.environment());

    simulation.run();
    let report = simulation.report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}\n", simulation.environment());
        println!("{}", report);
        println!("{}", simulation.agent().battery());
    }
    Ok(())
}

fn compare(args: CompareArgs) -> Result<()> {
    let comparator = StrategyComparator::new(ComparisonConfig {
        grid_size: args.size,
        dirt_probability: args.dirt_probability,
        runs_per_strategy: args.runs,
        max_steps: args.max_steps,
        seed: args.seed,
        ..ComparisonConfig::default()
    })?;
    let results = comparator.run()?;
    let summaries = comparator.summarize(&results);
    info!(runs = results.len(), "comparison finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{}", summary);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Compare(args) => compare(args),
    }
}
