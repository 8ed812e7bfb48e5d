//! Background temperature model.
//!
//! Maintains the per-cell baseline of the empty doorway in two phases:
//! an atomic calibration window that averages the first N frames, and an
//! adaptive phase that folds ambient drift into the baseline with a slow
//! EWMA. Foreground cells are excluded from adaptation so a lingering
//! person is never baked into the baseline.

use crate::constants::{GRID_SIZE, TOTAL_CELLS};
use crate::frame::{all_finite, Background, CellMask, Frame};
use crate::{Error, Result};
use log::{debug, info};
use std::io::{Read, Write};
use std::path::Path;

/// Progress of the calibration window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Calibration still needs this many frames
    More { remaining: usize },
    /// The baseline is ready
    Ready,
}

/// Per-cell baseline temperature model
#[derive(Debug)]
pub struct BackgroundModel {
    required_frames: usize,
    alpha: f32,
    /// Calibration sums, accumulated in f64 to keep the mean exact
    sums: [f64; TOTAL_CELLS],
    collected: usize,
    background: Option<Background>,
}

impl BackgroundModel {
    /// Create a model that calibrates over `calibration_frames` frames and
    /// then adapts with EWMA weight `adaptive_alpha`.
    #[must_use]
    pub fn new(calibration_frames: usize, adaptive_alpha: f32) -> Self {
        Self {
            required_frames: calibration_frames,
            alpha: adaptive_alpha,
            sums: [0.0; TOTAL_CELLS],
            collected: 0,
            background: None,
        }
    }

    /// Whether the baseline is ready
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.background.is_some()
    }

    /// Feed one frame of the calibration window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] for a non-finite frame; the frame is
    /// discarded and the calibration counter does not advance.
    pub fn feed_calibration(&mut self, frame: &Frame) -> Result<CalibrationStatus> {
        if !all_finite(frame) {
            return Err(Error::InvalidFrame(
                "non-finite cell during calibration".to_string(),
            ));
        }

        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                self.sums[row * GRID_SIZE + col] += f64::from(frame[(row, col)]);
            }
        }
        self.collected += 1;

        if self.collected < self.required_frames {
            return Ok(CalibrationStatus::More {
                remaining: self.required_frames - self.collected,
            });
        }

        let mut background = Background::zeros();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let mean = self.sums[row * GRID_SIZE + col] / self.collected as f64;
                background[(row, col)] = mean as f32;
            }
        }
        self.background = Some(background);
        info!(
            "background calibrated over {} frames, grid mean {:.2} C",
            self.collected,
            background.mean()
        );
        Ok(CalibrationStatus::Ready)
    }

    /// The current baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] until the calibration window completes.
    pub fn current(&self) -> Result<&Background> {
        self.background.as_ref().ok_or(Error::Calibration {
            collected: self.collected,
            required: self.required_frames,
        })
    }

    /// Fold the current frame into the baseline, skipping foreground cells.
    ///
    /// No-op until calibration completes.
    pub fn update_adaptive(&mut self, frame: &Frame, foreground: &CellMask) {
        let Some(background) = self.background.as_mut() else {
            return;
        };
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if !foreground.contains(row, col) {
                    let cell = &mut background[(row, col)];
                    // bg + a*(frame - bg): exact once the cell has converged
                    *cell += self.alpha * (frame[(row, col)] - *cell);
                }
            }
        }
    }

    /// Install a previously persisted baseline, skipping calibration.
    pub fn install(&mut self, background: Background) {
        self.background = Some(background);
        self.collected = self.required_frames;
    }

    /// Discard the baseline and re-enter the calibration phase.
    pub fn reset(&mut self) {
        self.sums = [0.0; TOTAL_CELLS];
        self.collected = 0;
        self.background = None;
        debug!("background model reset, recalibrating");
    }

    /// Persist the baseline: 64 little-endian f64 values, row-major, no header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] before the baseline is ready, or an
    /// I/O error from the filesystem.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let background = self.current()?;
        let mut file = std::fs::File::create(&path)?;
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                file.write_all(&f64::from(background[(row, col)]).to_le_bytes())?;
            }
        }
        info!("background saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Read a persisted baseline from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] for a truncated or non-finite file,
    /// or an I/O error from the filesystem.
    pub fn read_background<P: AsRef<Path>>(path: P) -> Result<Background> {
        let mut file = std::fs::File::open(&path)?;
        let mut bytes = [0_u8; TOTAL_CELLS * 8];
        file.read_exact(&mut bytes).map_err(|_| {
            Error::InvalidFrame(format!(
                "background file {} is not {} bytes",
                path.as_ref().display(),
                TOTAL_CELLS * 8
            ))
        })?;

        let mut background = Background::zeros();
        for index in 0..TOTAL_CELLS {
            let mut cell = [0_u8; 8];
            cell.copy_from_slice(&bytes[index * 8..index * 8 + 8]);
            let value = f64::from_le_bytes(cell);
            if !value.is_finite() {
                return Err(Error::InvalidFrame(format!(
                    "non-finite cell {index} in background file"
                )));
            }
            background[(index / GRID_SIZE, index % GRID_SIZE)] = value as f32;
        }
        Ok(background)
    }
}
