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

#![warn(missing_docs)]

//! Grid world for a cleaning agent.
//!
//! A square grid of cells that are either clean, dirty, blocked by an obstacle, or the single
//! charging station. The charger always sits in the bottom-right corner. Once built, the only
//! mutation the grid allows is cleaning a dirty cell.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest grid that still has room for a start cell and a charger.
pub const MIN_SIZE: usize = 2;

/// Grid world error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// Grid is too small.
    #[error("grid size must be at least {MIN_SIZE}, got {0}")]
    InvalidSize(usize),

    /// Location is outside of the grid.
    #[error("location ({x}, {y}) is outside of a {size}x{size} grid")]
    OutOfBounds {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
        /// Grid size.
        size: usize,
    },

    /// Dirt probability is not within [0, 1].
    #[error("dirt probability must be within [0, 1], got {0}")]
    InvalidDirtProbability(f64),

    /// Text form of the grid could not be parsed.
    #[error("malformed grid: {0}")]
    Malformed(String),
}

/// A cell coordinate. `x` is the column and `y` is the row, both starting at 0 in the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Column.
    pub x: usize,

    /// Row.
    pub y: usize,
}

impl Location {
    /// Create a new location.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// `|x1 - x2| + |y1 - y2|`.
    pub fn manhattan_distance(&self, other: &Location) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// `max(|x1 - x2|, |y1 - y2|)`, i.e. the box radius that contains `other`.
    pub fn chebyshev_distance(&self, other: &Location) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Move one cell in a direction. Returns None if that would underflow. Upper bounds are
    /// the grid's business.
    pub fn step(&self, direction: Direction) -> Option<Location> {
        let (dx, dy) = direction.delta();
        Some(Location {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal moves. There are no diagonal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards larger `y`.
    Down,

    /// Towards smaller `y`.
    Up,

    /// Towards larger `x`.
    Right,

    /// Towards smaller `x`.
    Left,
}

impl Direction {
    /// All directions, in the order neighbors are reported.
    pub const ALL: [Direction; 4] = [
        Direction::Down,
        Direction::Up,
        Direction::Right,
        Direction::Left,
    ];

    /// `(dx, dy)` for this direction.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
        }
    }
}

/// Grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Nothing to do here.
    Clean,

    /// Needs cleaning.
    Dirty,

    /// Impassable.
    Obstacle,

    /// The charging station.
    Charger,
}

impl Cell {
    fn as_char(&self) -> char {
        match self {
            Cell::Clean => '.',
            Cell::Dirty => '*',
            Cell::Obstacle => '#',
            Cell::Charger => 'C',
        }
    }

    fn from_char(c: char) -> Option<Cell> {
        match c {
            '.' => Some(Cell::Clean),
            '*' => Some(Cell::Dirty),
            '#' => Some(Cell::Obstacle),
            'C' => Some(Cell::Charger),
            _ => None,
        }
    }
}

/// Square grid environment. Row-major cells, charger fixed at `(size - 1, size - 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridEnvironment {
    cells: Vec<Cell>,
    size: usize,
}

// one row per line, cells separated by a space. This is also the text form FromStr accepts.
impl std::fmt::Display for GridEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::with_capacity(self.size * self.size * 2);
        for y in 0..self.size {
            for x in 0..self.size {
                s.push(self.cells[self.index(Location::new(x, y))].as_char());
                if x < self.size - 1 {
                    s.push(' ');
                }
            }
            if y < self.size - 1 {
                s.push('\n');
            }
        }
        write!(f, "{}", s)
    }
}

impl FromStr for GridEnvironment {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<Vec<char>> = s
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect();
        let size = rows.len();
        if size < MIN_SIZE {
            return Err(GridError::InvalidSize(size));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(GridError::Malformed(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    size
                )));
            }
            for (x, c) in row.iter().enumerate() {
                let cell = Cell::from_char(*c).ok_or_else(|| {
                    GridError::Malformed(format!("unknown cell {:?} at ({}, {})", c, x, y))
                })?;
                cells.push(cell);
            }
        }

        let chargers = cells.iter().filter(|&&c| c == Cell::Charger).count();
        if chargers != 1 || cells[size * size - 1] != Cell::Charger {
            return Err(GridError::Malformed(format!(
                "expected exactly one charger at ({}, {}), found {}",
                size - 1,
                size - 1,
                chargers
            )));
        }

        Ok(Self { cells, size })
    }
}

impl GridEnvironment {
    /// Create a clean grid with only the charger placed.
    pub fn new(size: usize) -> Result<Self, GridError> {
        if size < MIN_SIZE {
            return Err(GridError::InvalidSize(size));
        }
        let mut cells = vec![Cell::Clean; size * size];
        cells[size * size - 1] = Cell::Charger;
        Ok(Self { cells, size })
    }

    /// Create a grid where every cell is dirty with probability `dirt_probability`. The start
    /// cell `(0, 0)` is always clean, the charger is in the bottom-right corner, and one obstacle
    /// sits in the middle of the grid unless that would cover the start or the charger.
    pub fn generate<R: Rng + ?Sized>(
        size: usize,
        dirt_probability: f64,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        if !(0.0..=1.0).contains(&dirt_probability) {
            return Err(GridError::InvalidDirtProbability(dirt_probability));
        }
        let mut grid = Self::new(size)?;
        for cell in grid.cells.iter_mut() {
            if *cell == Cell::Clean && rng.gen_bool(dirt_probability) {
                *cell = Cell::Dirty;
            }
        }

        let start = Location::new(0, 0);
        let start_index = grid.index(start);
        grid.cells[start_index] = Cell::Clean;

        let obstacle = Location::new(size / 2, size / 2);
        if obstacle != start && obstacle != grid.charger() {
            let obstacle_index = grid.index(obstacle);
            grid.cells[obstacle_index] = Cell::Obstacle;
        }
        Ok(grid)
    }

    /// Width and height of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells.
    pub fn total_cells(&self) -> usize {
        self.size * self.size
    }

    /// The charger is always in the bottom-right corner.
    pub fn charger(&self) -> Location {
        Location::new(self.size - 1, self.size - 1)
    }

    /// Whether a location is inside the grid.
    pub fn in_bounds(&self, location: Location) -> bool {
        location.x < self.size && location.y < self.size
    }

    /// Get a cell, or None if out of bounds.
    pub fn get(&self, location: Location) -> Option<Cell> {
        if self.in_bounds(location) {
            Some(self.cells[self.index(location)])
        } else {
            None
        }
    }

    /// Get a cell, with an error if out of bounds.
    pub fn cell(&self, location: Location) -> Result<Cell, GridError> {
        self.get(location).ok_or(GridError::OutOfBounds {
            x: location.x,
            y: location.y,
            size: self.size,
        })
    }

    /// In bounds and not an obstacle.
    pub fn is_passable(&self, location: Location) -> bool {
        matches!(self.get(location), Some(cell) if cell != Cell::Obstacle)
    }

    /// All dirty cells, row by row.
    pub fn dirty_cells(&self) -> Vec<Location> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Dirty)
            .map(|(i, _)| Location::new(i % self.size, i / self.size))
            .collect()
    }

    /// Count cells of one kind.
    pub fn count(&self, kind: Cell) -> usize {
        self.cells.iter().filter(|&&cell| cell == kind).count()
    }

    /// Passable 4-connected neighbors in [`Direction::ALL`] order.
    pub fn neighbors(&self, location: Location) -> Vec<Location> {
        Direction::ALL
            .iter()
            .filter_map(|direction| location.step(*direction))
            .filter(|neighbor| self.is_passable(*neighbor))
            .collect()
    }

    /// Clean a cell. Returns true only if it was dirty; any other cell is left alone.
    pub fn set_clean(&mut self, location: Location) -> Result<bool, GridError> {
        let index = match self.cell(location)? {
            Cell::Dirty => self.index(location),
            _ => return Ok(false),
        };
        self.cells[index] = Cell::Clean;
        Ok(true)
    }

    fn index(&self, location: Location) -> usize {
        location.y * self.size + location.x
    }
}
