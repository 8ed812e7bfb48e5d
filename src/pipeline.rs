//! The frame-to-events pipeline.
//!
//! One explicit object owns every stage: background model, foreground
//! discriminator, body extractor, and tracker. It is stepped synchronously
//! by the frame source's clock; each tick consumes one raw frame and
//! returns the frame's crossing events. Events for frame k are fully
//! returned before frame k+1 is processed, and the whole step is bounded
//! and lock-free.

use crate::background::{BackgroundModel, CalibrationStatus};
use crate::config::Config;
use crate::extractor::BodyExtractor;
use crate::foreground::ForegroundDiscriminator;
use crate::frame::{all_finite, Background, Frame};
use crate::tracker::{CrossingEvent, Tracker};
use crate::{Error, Result};
use log::{info, warn};
use std::time::SystemTime;

/// The complete processing pipeline
#[derive(Debug)]
pub struct Pipeline {
    background: BackgroundModel,
    discriminator: ForegroundDiscriminator,
    extractor: BodyExtractor,
    tracker: Tracker,
    frame_index: u64,
    /// Suppresses repeated invalid-frame logging within one burst
    invalid_burst: bool,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is out of range;
    /// construction is the only place configuration errors surface.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            background: BackgroundModel::new(
                config.background.calibration_frames,
                config.background.adaptive_alpha,
            ),
            discriminator: ForegroundDiscriminator::new(
                &config.foreground,
                config.bodies.min_body_cells,
            ),
            extractor: BodyExtractor::new(&config.bodies),
            tracker: Tracker::new(&config.tracking),
            frame_index: 0,
            invalid_burst: false,
        })
    }

    /// Whether the pipeline is still consuming its calibration window.
    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        !self.background.is_calibrated()
    }

    /// Index of the last processed frame.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The current background baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] until the calibration window completes.
    pub fn background(&self) -> Result<&Background> {
        self.background.current()
    }

    /// Persist the calibrated background to disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] before readiness, or an I/O error.
    pub fn save_background<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.background.save(path)
    }

    /// Install a previously persisted background, skipping calibration.
    pub fn install_background(&mut self, background: Background) {
        self.background.install(background);
        info!("persisted background installed, calibration skipped");
    }

    /// Process one frame and return its crossing events in ascending
    /// track id order.
    ///
    /// During calibration the frame feeds the background model and nothing
    /// reaches the tracker. An invalid frame is dropped without advancing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] for a frame with non-finite cells.
    pub fn step(&mut self, wall_clock: SystemTime, frame: &Frame) -> Result<Vec<CrossingEvent>> {
        if !all_finite(frame) {
            if !self.invalid_burst {
                warn!("dropping invalid frame(s): non-finite cell values");
                self.invalid_burst = true;
            }
            return Err(Error::InvalidFrame("non-finite cell value".to_string()));
        }
        self.invalid_burst = false;

        if self.is_calibrating() {
            if self.background.feed_calibration(frame)? == CalibrationStatus::Ready {
                info!("calibration complete, pipeline live");
            }
            return Ok(Vec::new());
        }

        self.frame_index += 1;
        let (delta, mask) = {
            let background = self.background.current()?;
            self.discriminator.discriminate(frame, background)
        };

        let detections = if mask.is_empty() {
            Vec::new()
        } else {
            self.extractor.extract(&mask, &delta)
        };

        // Ambient drift tracks into every cell the current frame did not
        // classify as a person
        self.background.update_adaptive(frame, &mask);

        Ok(self.tracker.step(self.frame_index, wall_clock, &detections))
    }

    /// Finish processing: flush live tracks through the direction
    /// classifier as if they died this frame.
    pub fn stop(&mut self, wall_clock: SystemTime) -> Vec<CrossingEvent> {
        info!("pipeline stopping, flushing live tracks");
        self.tracker.flush(self.frame_index, wall_clock)
    }

    /// Discard the background and all live tracks and re-enter calibration.
    pub fn recalibrate(&mut self) {
        info!("recalibration requested");
        self.background.reset();
        self.tracker.clear();
    }

    /// Live track count, for host-side status reporting.
    #[must_use]
    pub fn live_tracks(&self) -> usize {
        self.tracker.tracks().count()
    }
}
