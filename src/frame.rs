//! Canonical frame types shared by every pipeline stage.
//!
//! Every stage operates on the same fixed-size 8x8 matrix: the raw frame,
//! the background baseline, and the per-cell delta all share one shape, so
//! no stage needs to re-validate geometry.

use crate::constants::{GRID_SIZE, TOTAL_CELLS};
use crate::{Error, Result};
use nalgebra::SMatrix;

/// One raw sensor frame: Celsius temperatures, row-major on the grid.
/// Row index increases toward one side of the doorway; column index runs
/// along the traversal axis.
pub type Frame = SMatrix<f32, GRID_SIZE, GRID_SIZE>;

/// Per-cell baseline temperature of the empty doorway.
pub type Background = SMatrix<f32, GRID_SIZE, GRID_SIZE>;

/// Per-cell temperature excess, `frame - background`.
pub type Delta = SMatrix<f32, GRID_SIZE, GRID_SIZE>;

/// Build a frame from 64 row-major Celsius values.
///
/// # Errors
///
/// Returns [`Error::InvalidFrame`] if the slice is not exactly 64 values
/// long or contains a non-finite value.
pub fn frame_from_celsius(values: &[f32]) -> Result<Frame> {
    if values.len() != TOTAL_CELLS {
        return Err(Error::InvalidFrame(format!(
            "expected {TOTAL_CELLS} cells, got {}",
            values.len()
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::InvalidFrame(format!("non-finite cell value {bad}")));
    }
    Ok(Frame::from_row_slice(values))
}

/// Whether every cell of the grid holds a finite value.
#[must_use]
pub fn all_finite(grid: &Frame) -> bool {
    grid.iter().all(|v| v.is_finite())
}

/// Flatten a grid to 64 row-major values.
#[must_use]
pub fn to_row_major(grid: &Frame) -> [f32; TOTAL_CELLS] {
    let mut out = [0.0; TOTAL_CELLS];
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            out[row * GRID_SIZE + col] = grid[(row, col)];
        }
    }
    out
}

/// Boolean per-cell mask over the grid.
///
/// `true` marks a foreground cell. Iteration order is row-major, which the
/// extractor relies on for deterministic component labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellMask {
    cells: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl CellMask {
    /// The all-false mask.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cell at (row, col) is set.
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells[row][col]
    }

    /// Mark the cell at (row, col) as foreground.
    pub fn insert(&mut self, row: usize, col: usize) {
        self.cells[row][col] = true;
    }

    /// Number of set cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c).count()
    }

    /// Whether no cell is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().flatten().any(|&c| c)
    }

    /// Set cells in row-major order as (row, col) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..GRID_SIZE)
            .flat_map(|row| (0..GRID_SIZE).map(move |col| (row, col)))
            .filter(|&(row, col)| self.cells[row][col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_celsius_roundtrip() {
        let values: Vec<f32> = (0..TOTAL_CELLS).map(|i| 20.0 + i as f32 * 0.25).collect();
        let frame = frame_from_celsius(&values).unwrap();

        assert_eq!(frame[(0, 0)], 20.0);
        assert_eq!(frame[(0, 1)], 20.25);
        assert_eq!(frame[(1, 0)], 22.0);
        assert_eq!(to_row_major(&frame).to_vec(), values);
    }

    #[test]
    fn test_frame_from_celsius_rejects_bad_input() {
        assert!(frame_from_celsius(&[20.0; 63]).is_err());
        assert!(frame_from_celsius(&[20.0; 65]).is_err());

        let mut values = [20.0; TOTAL_CELLS];
        values[17] = f32::NAN;
        assert!(frame_from_celsius(&values).is_err());

        values[17] = f32::INFINITY;
        assert!(frame_from_celsius(&values).is_err());
    }

    #[test]
    fn test_all_finite() {
        let frame = Frame::from_element(21.5);
        assert!(all_finite(&frame));

        let mut bad = frame;
        bad[(3, 4)] = f32::NEG_INFINITY;
        assert!(!all_finite(&bad));
    }

    #[test]
    fn test_cell_mask_iteration_is_row_major() {
        let mut mask = CellMask::empty();
        mask.insert(2, 5);
        mask.insert(0, 7);
        mask.insert(2, 1);

        assert_eq!(mask.len(), 3);
        let cells: Vec<_> = mask.iter().collect();
        assert_eq!(cells, vec![(0, 7), (2, 1), (2, 5)]);
    }

    #[test]
    fn test_cell_mask_empty() {
        let mask = CellMask::empty();
        assert!(mask.is_empty());
        assert_eq!(mask.len(), 0);
        assert_eq!(mask.iter().count(), 0);
    }
}
