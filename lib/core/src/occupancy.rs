//! Grid-cell occupancy registry.
//!
//! Tracks which cells are claimed by a node and answers nearest-free-cell
//! queries. The grid is unbounded while the set of claimed cells is finite,
//! so every search terminates.

use crate::graph::Position;
use ahash::AHashSet;

/// Largest coordinate magnitude a snapped cell may take.
pub const GRID_LIMIT: i64 = 1 << 40;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyGrid {
    cells: AHashSet<Position>,
}

impl OccupancyGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = Position>) -> Self {
        Self {
            cells: positions.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_free(&self, x: i64, y: i64) -> bool {
        !self.cells.contains(&Position::new(x, y))
    }

    #[inline]
    pub fn is_occupied(&self, position: &Position) -> bool {
        self.cells.contains(position)
    }

    /// Claims a cell. Returns `false` when it was already claimed; the claim
    /// still stands and the caller decides whether to warn.
    pub fn reserve(&mut self, position: Position) -> bool {
        self.cells.insert(position)
    }

    /// Frees a cell. Returns `false` when it was not claimed.
    pub fn release(&mut self, position: Position) -> bool {
        self.cells.remove(&position)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.cells.iter()
    }

    /// Walks down column `x` from `y_start` in `step` increments.
    pub fn nearest_free_along_y(&self, x: i64, y_start: i64, step: i64) -> i64 {
        let step = step.max(1);
        let mut y = y_start;
        while !self.is_free(x, y) {
            y += step;
        }
        y
    }

    /// Searches column `x` at offsets `0, +step, -step, +2*step, -2*step, ...`.
    pub fn nearest_free_balanced(&self, x: i64, y_start: i64, step: i64) -> i64 {
        let step = step.max(1);
        balanced_offsets(step)
            .map(|offset| y_start + offset)
            .find(|&y| self.is_free(x, y))
            .unwrap_or(y_start)
    }

    /// Snaps a free-form drop point onto the grid, then searches up and down
    /// in `y` by growing offsets until a free cell turns up.
    ///
    /// Targets are clamped to `±GRID_LIMIT` first; a non-finite target
    /// snaps to the origin.
    pub fn closest_free_grid_cell(
        &self,
        target_x: f64,
        target_y: f64,
        step_x: i64,
        step_y: i64,
    ) -> Position {
        let step_x = step_x.clamp(1, GRID_LIMIT);
        let step_y = step_y.clamp(1, GRID_LIMIT);
        let x = snap(target_x, step_x);
        let y = snap(target_y, step_y);
        if self.is_free(x, y) {
            return Position::new(x, y);
        }

        let mut offset = step_y;
        loop {
            let below = y.saturating_add(offset);
            if self.is_free(x, below) {
                return Position::new(x, below);
            }
            let above = y.saturating_sub(offset);
            if self.is_free(x, above) {
                return Position::new(x, above);
            }
            offset = offset.saturating_add(step_y);
        }
    }
}

/// `0, +s, -s, +2s, -2s, ...`
fn balanced_offsets(step: i64) -> impl Iterator<Item = i64> {
    (0i64..).map(move |i| {
        if i % 2 == 1 {
            (i + 1) / 2 * step
        } else {
            -(i / 2) * step
        }
    })
}

/// Rounds half up to the nearest multiple of `step`. `step` must lie in
/// `1..=GRID_LIMIT`, which keeps the product well inside `i64`.
fn snap(value: f64, step: i64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let limit = GRID_LIMIT as f64;
    let cells = (value.clamp(-limit, limit) / step as f64 + 0.5).floor();
    cells as i64 * step
}
