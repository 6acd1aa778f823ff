//! Cursor position and scrolling region
//!
//! The column may transiently equal the number of columns: that is the
//! pending-wrap position reached after printing into the last column.

use serde::{Deserialize, Serialize};

/// Cursor position (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    /// Create a cursor at the given position
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Move to the home position (0, 0)
    pub fn home(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    /// Move up by n rows, stopping at row 0
    pub fn move_up(&mut self, n: usize) {
        self.row = self.row.saturating_sub(n);
    }

    /// Move down by n rows, stopping at the last row
    pub fn move_down(&mut self, n: usize, rows: usize) {
        self.row = self.row.saturating_add(n).min(rows.saturating_sub(1));
    }

    /// Move right by n columns, stopping at the last column
    pub fn move_forward(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
    }

    /// Move left by n columns, stopping at column 0
    pub fn move_backward(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
    }

    /// Set the row from a 1-based value, clamped to the screen
    pub fn set_row_1based(&mut self, row: usize, rows: usize) {
        self.row = clamp_1based(row, rows);
    }

    /// Set the column from a 1-based value, clamped to the screen
    pub fn set_col_1based(&mut self, col: usize, cols: usize) {
        self.col = clamp_1based(col, cols);
    }

    /// Clamp into a (possibly smaller) geometry, e.g. after a resize
    pub fn clamp_to(&mut self, cols: usize, rows: usize) {
        self.row = self.row.min(rows.saturating_sub(1));
        self.col = self.col.min(cols);
    }
}

/// Convert a 1-based coordinate to 0-based, clamped to `[1, limit]`
fn clamp_1based(value: usize, limit: usize) -> usize {
    value.clamp(1, limit.max(1)) - 1
}

/// Half-open scrolling region `[top, bottom)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    /// Region covering the whole screen
    pub fn full(rows: usize) -> Self {
        Self {
            top: 0,
            bottom: rows,
        }
    }

    /// Number of rows in the region
    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Whether a row lies inside the region
    pub fn contains(&self, row: usize) -> bool {
        row >= self.top && row < self.bottom
    }
}
