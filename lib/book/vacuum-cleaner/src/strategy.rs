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

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const DEFAULT_CONSERVATION_THRESHOLD: u32 = 30;
pub const DEFAULT_CONSERVATION_RADIUS: usize = 2;

/// Which strategy, without its parameters. This is the tag that shows up in metrics and config.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Wander in a random direction each step.
    Random,

    /// Head for the nearest dirt along a weighted A* path.
    #[default]
    #[serde(alias = "astar")]
    WeightedSearch,

    /// Like WeightedSearch, but only chase nearby dirt when the battery runs low.
    #[serde(alias = "optimized")]
    Adaptive,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Random,
        StrategyKind::WeightedSearch,
        StrategyKind::Adaptive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::WeightedSearch => "weighted-search",
            StrategyKind::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(StrategyKind::Random),
            "weighted-search" | "weighted_search" | "astar" => Ok(StrategyKind::WeightedSearch),
            "adaptive" | "optimized" => Ok(StrategyKind::Adaptive),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// A strategy together with the parameters only it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Random,
    WeightedSearch,
    Adaptive {
        /// Below this battery level, only dirt within `radius` is considered.
        conservation_threshold: u32,

        /// Box radius around the agent.
        radius: usize,
    },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Random => StrategyKind::Random,
            Strategy::WeightedSearch => StrategyKind::WeightedSearch,
            Strategy::Adaptive { .. } => StrategyKind::Adaptive,
        }
    }

    /// Random wandering never heads back to the charger on its own.
    pub fn seeks_charger(&self) -> bool {
        !matches!(self, Strategy::Random)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}
