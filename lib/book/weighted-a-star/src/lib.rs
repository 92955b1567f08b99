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

// Weighted A* search. See Chapter 3 page 90, "Weighted A* search".
//
// f(n) = g(n) + W * h(n), W >= 1. With W = 1 and an admissible heuristic this is plain A* and the
// returned path is optimal. Larger W trades optimality for fewer expansions.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::hash::Hash;

pub type Int = i64;
pub type Float = f64;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

/// Weights below this are clamped up to it.
pub const MIN_EPSILON: Float = 1.0;

pub trait Node: Clone + Copy + PartialEq + Eq + Hash + Debug {}

impl<T> Node for T where T: Clone + Copy + PartialEq + Eq + Hash + Debug {}

/// A SearchSpace knows how to move from one node to its neighbors and how far a node is from a
/// goal. The search itself never looks inside a node.
pub trait SearchSpace<_Node: Node> {
    /// Neighbors reachable in one move, with the cost of that move.
    fn successors(&self, node: &_Node) -> Vec<(_Node, Int)>;

    /// Estimated cost from `node` to `goal`.
    fn heuristic(&self, node: &_Node, goal: &_Node) -> Int;
}

/// Clamp a weight to at least [`MIN_EPSILON`]. NaN also becomes [`MIN_EPSILON`].
pub fn clamp_epsilon(epsilon: Float) -> Float {
    epsilon.max(MIN_EPSILON)
}

/// f = g + epsilon * h
pub fn priority(g: Int, h: Int, epsilon: Float) -> Float {
    g as Float + epsilon * h as Float
}

// Each entry carries the whole path to its node rather than a parent pointer, so the same node may
// be queued several times with different paths. Whichever copy is popped first wins.
#[derive(Debug, Clone)]
struct FrontierEntry<_Node: Node> {
    f: Float,
    g: Int,
    sequence: u64,
    node: _Node,
    path: Vec<_Node>,
}

// BinaryHeap is a max-heap, so both comparisons are reversed: lowest f first, then earliest
// insertion first.
impl<_Node: Node> Ord for FrontierEntry<_Node> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl<_Node: Node> PartialOrd for FrontierEntry<_Node> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<_Node: Node> PartialEq for FrontierEntry<_Node> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<_Node: Node> Eq for FrontierEntry<_Node> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<_Node: Node> {
    /// Nodes after the start up to and including the goal. Empty if the goal is the start or if
    /// the goal is unreachable.
    pub path: Vec<_Node>,

    /// Cost of `path`, None if the goal is unreachable.
    pub cost: Option<Int>,

    /// Number of nodes expanded.
    pub expansions: usize,
}

impl<_Node: Node> SearchResult<_Node> {
    pub fn is_reachable(&self) -> bool {
        self.cost.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedAStar {
    epsilon: Float,
}

impl Default for WeightedAStar {
    fn default() -> Self {
        Self::new(MIN_EPSILON)
    }
}

impl WeightedAStar {
    pub fn new(epsilon: Float) -> Self {
        Self {
            epsilon: clamp_epsilon(epsilon),
        }
    }

    pub fn epsilon(&self) -> Float {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: Float) {
        self.epsilon = clamp_epsilon(epsilon);
    }

    pub fn search<_Space, _Node>(&self, space: &_Space, start: _Node, goal: _Node) -> Vec<_Node>
    where
        _Space: SearchSpace<_Node>,
        _Node: Node,
    {
        self.search_with_stats(space, start, goal).path
    }

    pub fn search_with_stats<_Space, _Node>(
        &self,
        space: &_Space,
        start: _Node,
        goal: _Node,
    ) -> SearchResult<_Node>
    where
        _Space: SearchSpace<_Node>,
        _Node: Node,
    {
        let mut frontier = BinaryHeap::new();
        let mut visited: HashSet<_Node> = HashSet::default();
        let mut sequence: u64 = 0;
        let mut expansions = 0;

        frontier.push(FrontierEntry {
            f: priority(0, space.heuristic(&start, &goal), self.epsilon),
            g: 0,
            sequence,
            node: start,
            path: vec![start],
        });

        while let Some(FrontierEntry { g, node, path, .. }) = frontier.pop() {
            if node == goal {
                return SearchResult {
                    path: path[1..].to_vec(),
                    cost: Some(g),
                    expansions,
                };
            }
            if !visited.insert(node) {
                continue;
            }
            expansions += 1;

            for (successor, step_cost) in space.successors(&node) {
                if visited.contains(&successor) {
                    continue;
                }
                let g_new = g + step_cost;
                let mut path_new = Vec::with_capacity(path.len() + 1);
                path_new.extend_from_slice(&path);
                path_new.push(successor);
                sequence += 1;
                frontier.push(FrontierEntry {
                    f: priority(g_new, space.heuristic(&successor, &goal), self.epsilon),
                    g: g_new,
                    sequence,
                    node: successor,
                    path: path_new,
                });
            }
        }

        SearchResult {
            path: Vec::new(),
            cost: None,
            expansions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    type Point = (i32, i32);

    // Open square grid with some blocked points. 4-connected, unit cost, Manhattan heuristic.
    #[derive(Debug)]
    struct TestGrid {
        size: i32,
        blocked: HashSet<Point>,
    }

    impl TestGrid {
        fn new(size: i32) -> Self {
            Self {
                size,
                blocked: HashSet::default(),
            }
        }

        fn with_blocked(mut self, points: &[Point]) -> Self {
            self.blocked.extend(points.iter().copied());
            self
        }

        fn is_open(&self, (x, y): Point) -> bool {
            x >= 0 && y >= 0 && x < self.size && y < self.size && !self.blocked.contains(&(x, y))
        }

        // breadth-first distance, the ground truth for unit costs
        fn bfs_distance(&self, start: Point, goal: Point) -> Option<usize> {
            let mut queue = VecDeque::from([(start, 0)]);
            let mut seen: HashSet<Point> = HashSet::default();
            seen.insert(start);
            while let Some((point, distance)) = queue.pop_front() {
                if point == goal {
                    return Some(distance);
                }
                for (next, _) in self.successors(&point) {
                    if seen.insert(next) {
                        queue.push_back((next, distance + 1));
                    }
                }
            }
            None
        }
    }

    impl SearchSpace<Point> for TestGrid {
        fn successors(&self, &(x, y): &Point) -> Vec<(Point, Int)> {
            [(x, y + 1), (x, y - 1), (x + 1, y), (x - 1, y)]
                .into_iter()
                .filter(|p| self.is_open(*p))
                .map(|p| (p, 1))
                .collect()
        }

        fn heuristic(&self, a: &Point, b: &Point) -> Int {
            ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as Int
        }
    }

    fn assert_is_walk(start: Point, path: &[Point]) {
        let mut previous = start;
        for point in path {
            let step = (point.0 - previous.0).abs() + (point.1 - previous.1).abs();
            assert_eq!(step, 1, "{:?} -> {:?} is not a single move", previous, point);
            previous = *point;
        }
    }

    #[test]
    fn test_epsilon_is_clamped() {
        assert_abs_diff_eq!(WeightedAStar::new(0.5).epsilon(), 1.0);
        assert_abs_diff_eq!(WeightedAStar::new(Float::NAN).epsilon(), 1.0);
        let mut search = WeightedAStar::new(2.5);
        assert_abs_diff_eq!(search.epsilon(), 2.5);
        search.set_epsilon(-3.0);
        assert_abs_diff_eq!(search.epsilon(), 1.0);
    }

    #[test]
    fn test_priority_inflates_heuristic() {
        assert_abs_diff_eq!(priority(3, 4, 1.0), 7.0);
        assert_abs_diff_eq!(priority(3, 4, 1.5), 9.0);
    }

    #[test]
    fn test_open_grid_path_is_manhattan_length() {
        let grid = TestGrid::new(5);
        let result = WeightedAStar::new(1.0).search_with_stats(&grid, (0, 0), (4, 4));
        assert_eq!(result.path.len(), 8);
        assert_eq!(result.cost, Some(8));
        assert_eq!(result.path.last(), Some(&(4, 4)));
        assert!(!result.path.contains(&(0, 0)));
        assert_is_walk((0, 0), &result.path);
    }

    #[test]
    fn test_start_is_goal_returns_empty_path() {
        let grid = TestGrid::new(5);
        let result = WeightedAStar::default().search_with_stats(&grid, (2, 3), (2, 3));
        assert!(result.path.is_empty());
        assert_eq!(result.cost, Some(0));
        assert_eq!(result.expansions, 0);
    }

    #[test]
    fn test_enclosed_goal_returns_empty_path() {
        let grid = TestGrid::new(5).with_blocked(&[(2, 1), (2, 3), (1, 2), (3, 2)]);
        let result = WeightedAStar::default().search_with_stats(&grid, (0, 0), (2, 2));
        assert!(result.path.is_empty());
        assert!(!result.is_reachable());
        // every open cell outside the enclosure gets expanded exactly once
        assert_eq!(result.expansions, 25 - 5);
    }

    #[test]
    fn test_path_goes_around_wall() {
        // wall down column 2 with a gap at the bottom
        let grid = TestGrid::new(5).with_blocked(&[(2, 0), (2, 1), (2, 2), (2, 3)]);
        let path = WeightedAStar::default().search(&grid, (0, 0), (4, 0));
        assert_eq!(path.len(), 12);
        assert!(path.contains(&(2, 4)));
        assert_is_walk((0, 0), &path);
    }

    // Diamond with zero heuristic, so both routes tie on f at every step. The first successor
    // pushed is expanded first.
    struct Diamond {
        reversed: bool,
    }

    impl SearchSpace<char> for Diamond {
        fn successors(&self, node: &char) -> Vec<(char, Int)> {
            let mut next = match node {
                'a' => vec![('b', 1), ('c', 1)],
                'b' | 'c' => vec![('d', 1)],
                _ => vec![],
            };
            if self.reversed {
                next.reverse();
            }
            next
        }

        fn heuristic(&self, _node: &char, _goal: &char) -> Int {
            0
        }
    }

    #[test]
    fn test_ties_are_broken_by_insertion_order() {
        let search = WeightedAStar::default();
        assert_eq!(
            search.search(&Diamond { reversed: false }, 'a', 'd'),
            vec!['b', 'd']
        );
        assert_eq!(
            search.search(&Diamond { reversed: true }, 'a', 'd'),
            vec!['c', 'd']
        );
    }

    fn grid_strategy() -> impl Strategy<Value = TestGrid> {
        (3..9i32).prop_flat_map(|size| {
            prop::collection::vec(prop::bool::weighted(0.25), (size * size) as usize).prop_map(
                move |cells| {
                    let blocked = cells
                        .iter()
                        .enumerate()
                        .filter(|(_, b)| **b)
                        .map(|(i, _)| (i as i32 % size, i as i32 / size))
                        .filter(|&p| p != (0, 0) && p != (size - 1, size - 1))
                        .collect();
                    TestGrid { size, blocked }
                },
            )
        })
    }

    proptest! {
        #[test]
        fn test_unit_weight_matches_breadth_first_distance(grid in grid_strategy()) {
            let goal = (grid.size - 1, grid.size - 1);
            let path = WeightedAStar::new(1.0).search(&grid, (0, 0), goal);
            match grid.bfs_distance((0, 0), goal) {
                Some(distance) => {
                    prop_assert_eq!(path.len(), distance);
                    assert_is_walk((0, 0), &path);
                }
                None => prop_assert!(path.is_empty()),
            }
        }

        #[test]
        fn test_inflated_weight_still_finds_a_valid_path(
            grid in grid_strategy(),
            epsilon in 1.0..5.0f64,
        ) {
            let goal = (grid.size - 1, grid.size - 1);
            let path = WeightedAStar::new(epsilon).search(&grid, (0, 0), goal);
            match grid.bfs_distance((0, 0), goal) {
                Some(distance) => {
                    prop_assert!(path.len() >= distance);
                    prop_assert_eq!(path.last(), Some(&goal));
                    assert_is_walk((0, 0), &path);
                }
                None => prop_assert!(path.is_empty()),
            }
        }
    }
}
