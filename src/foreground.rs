//! Foreground discrimination: decides whether a frame contains a person
//! and which cells belong to them.
//!
//! Three gates run in order; failing any of them yields the empty mask,
//! which downstream treats as "no foreground" so the background model
//! adapts into every cell. With only 64 pixels the Otsu split runs on the
//! continuous delta values directly, no integer binning.

use crate::config::ForegroundConfig;
use crate::constants::{GRID_SIZE, TOTAL_CELLS};
use crate::frame::{Background, CellMask, Delta, Frame};

/// Result of the Otsu split over the 64 delta values
#[derive(Debug, Clone, Copy)]
struct OtsuSplit {
    /// Lowest delta classified as warm
    threshold: f32,
    warm_count: usize,
    cool_mean: f32,
    warm_mean: f32,
}

/// Three-gate presence cascade
#[derive(Debug)]
pub struct ForegroundDiscriminator {
    activity_threshold: f32,
    min_class_separation: f32,
    max_foreground_fraction: f32,
    tracking_threshold: f32,
    min_body_cells: usize,
}

impl ForegroundDiscriminator {
    #[must_use]
    pub fn new(config: &ForegroundConfig, min_body_cells: usize) -> Self {
        Self {
            activity_threshold: config.activity_threshold_c,
            min_class_separation: config.otsu_min_class_separation_c,
            max_foreground_fraction: config.otsu_max_foreground_fraction,
            tracking_threshold: config.tracking_temp_threshold_c,
            min_body_cells,
        }
    }

    /// Classify the frame's cells against the background.
    ///
    /// Returns the per-cell delta and the refined foreground mask; the mask
    /// is empty when any gate rejects the frame.
    pub fn discriminate(&self, frame: &Frame, background: &Background) -> (Delta, CellMask) {
        let delta: Delta = frame - background;

        // Gate A: no cell warm enough above baseline to be a body
        let peak = delta.max();
        if peak < self.activity_threshold {
            return (delta, CellMask::empty());
        }

        // Gate B: Otsu split must separate a plausible warm class
        let Some(split) = otsu_split(&delta) else {
            return (delta, CellMask::empty());
        };
        if split.warm_mean - split.cool_mean < self.min_class_separation {
            return (delta, CellMask::empty());
        }
        let max_warm_cells = (self.max_foreground_fraction * TOTAL_CELLS as f32) as usize;
        if split.warm_count > max_warm_cells {
            // A global ambient shift, not a person
            return (delta, CellMask::empty());
        }

        // Gate C: refine by the absolute tracking threshold
        let cutoff = split.threshold.max(self.tracking_threshold);
        let mut mask = CellMask::empty();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if delta[(row, col)] >= cutoff {
                    mask.insert(row, col);
                }
            }
        }
        if mask.len() < self.min_body_cells {
            return (delta, CellMask::empty());
        }

        (delta, mask)
    }
}

/// Exhaustive Otsu split over the 64 continuous delta values.
///
/// Sorts the values and scans every split point for maximal between-class
/// variance. Returns `None` when no split separates two non-empty classes
/// (e.g. all cells equal), which downstream treats as an empty frame.
fn otsu_split(delta: &Delta) -> Option<OtsuSplit> {
    let mut values = [0.0_f32; TOTAL_CELLS];
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            values[row * GRID_SIZE + col] = delta[(row, col)];
        }
    }
    values.sort_by(f32::total_cmp);

    let total: f32 = values.iter().sum();
    let mut best: Option<(f32, OtsuSplit)> = None;
    let mut prefix = 0.0_f32;

    for k in 1..TOTAL_CELLS {
        prefix += values[k - 1];
        // No separating threshold exists between equal values
        if values[k - 1] >= values[k] {
            continue;
        }

        let cool_count = k as f32;
        let warm_count = (TOTAL_CELLS - k) as f32;
        let cool_mean = prefix / cool_count;
        let warm_mean = (total - prefix) / warm_count;
        let w0 = cool_count / TOTAL_CELLS as f32;
        let w1 = warm_count / TOTAL_CELLS as f32;
        let variance = w0 * w1 * (warm_mean - cool_mean) * (warm_mean - cool_mean);

        if best.map_or(true, |(best_variance, _)| variance > best_variance) {
            best = Some((
                variance,
                OtsuSplit {
                    threshold: values[k],
                    warm_count: TOTAL_CELLS - k,
                    cool_mean,
                    warm_mean,
                },
            ));
        }
    }

    best.map(|(_, split)| split)
}
