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
use weighted_a_star::{Int, SearchResult, SearchSpace, WeightedAStar};

use crate::Environment;

/// Lets weighted A* walk an Environment: 4-connected unit-cost moves onto passable cells,
/// Manhattan distance as the heuristic.
struct Passable<'a, _Environment: Environment + ?Sized>(&'a _Environment);

impl<'a, _Environment> SearchSpace<Location> for Passable<'a, _Environment>
where
    _Environment: Environment + ?Sized,
{
    fn successors(&self, node: &Location) -> Vec<(Location, Int)> {
        self.0
            .neighbors(*node)
            .into_iter()
            .map(|next| (next, 1))
            .collect()
    }

    fn heuristic(&self, node: &Location, goal: &Location) -> Int {
        node.manhattan_distance(goal) as Int
    }
}

/// Cells from (excluding) `start` up to (including) `goal`. The path is empty both when
/// `start == goal` and when `goal` can't be reached; `SearchResult::is_reachable` tells them apart.
pub fn find_path<_Environment>(
    environment: &_Environment,
    search: &WeightedAStar,
    start: Location,
    goal: Location,
) -> SearchResult<Location>
where
    _Environment: Environment + ?Sized,
{
    search.search_with_stats(&Passable(environment), start, goal)
}
