//! Frame sources and the sensor hand-off buffer.
//!
//! The sensor driver itself lives outside this crate; what lives here is
//! its interface (the [`FrameSource`] trait), the single-slot buffer a
//! sensor I/O thread pushes into (the one place concurrency is allowed),
//! and a replay source for captured CSV data.

use crate::frame::{frame_from_celsius, Frame};
use crate::{Error, Result};
use log::{debug, warn};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One frame stamped with the sensor's wall clock
#[derive(Debug, Clone)]
pub struct TimedFrame {
    pub wall_clock: SystemTime,
    pub grid: Frame,
}

/// Supplies frames at roughly the nominal sensor cadence.
///
/// `Ok(None)` marks the end of a finite source (replay); a live sensor
/// source never returns it.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>>;
}

/// Bounded single-slot frame buffer between a sensor thread and the
/// pipeline thread. The latest frame wins on overflow; older frames are
/// dropped and counted.
#[derive(Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    available: Condvar,
}

#[derive(Default)]
struct SlotState {
    latest: Option<TimedFrame>,
    dropped: u64,
    closed: bool,
}

impl FrameSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame from the sensor thread, replacing any unconsumed one.
    pub fn publish(&self, frame: TimedFrame) {
        let mut state = self.state.lock().expect("frame slot poisoned");
        if state.latest.replace(frame).is_some() {
            state.dropped += 1;
            debug!("frame slot overflow, dropped stale frame ({} total)", state.dropped);
        }
        drop(state);
        self.available.notify_one();
    }

    /// Mark the sensor stream as finished.
    pub fn close(&self) {
        self.state.lock().expect("frame slot poisoned").closed = true;
        self.available.notify_all();
    }

    /// Take the most recent frame, waiting up to `grace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SensorStalled`] when no frame arrives within the
    /// grace window. A closed, drained slot yields `Ok(None)`.
    pub fn take_latest(&self, grace: Duration) -> Result<Option<TimedFrame>> {
        let deadline = std::time::Instant::now() + grace;
        let mut state = self.state.lock().expect("frame slot poisoned");
        loop {
            if let Some(frame) = state.latest.take() {
                return Ok(Some(frame));
            }
            if state.closed {
                return Ok(None);
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(Error::SensorStalled {
                    grace_ms: grace.as_millis() as u64,
                });
            }
            let (next, timeout) = self
                .available
                .wait_timeout(state, remaining)
                .expect("frame slot poisoned");
            state = next;
            if timeout.timed_out() && state.latest.is_none() && !state.closed {
                return Err(Error::SensorStalled {
                    grace_ms: grace.as_millis() as u64,
                });
            }
        }
    }

    /// Frames overwritten before the pipeline consumed them.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.state.lock().expect("frame slot poisoned").dropped
    }
}

/// Adapter presenting a [`FrameSlot`] as a [`FrameSource`].
pub struct SlotSource<'a> {
    slot: &'a FrameSlot,
    grace: Duration,
}

impl<'a> SlotSource<'a> {
    #[must_use]
    pub fn new(slot: &'a FrameSlot, grace: Duration) -> Self {
        Self { slot, grace }
    }
}

impl FrameSource for SlotSource<'_> {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>> {
        self.slot.take_latest(self.grace)
    }
}

/// Replays frames captured to CSV.
///
/// Expected row layout is the capture log format: a millisecond timestamp
/// first, 64 row-major Celsius cell values last; columns between them
/// (e.g. a recorded occupancy) are ignored. A header row is skipped.
pub struct ReplaySource {
    frames: VecDeque<TimedFrame>,
}

impl ReplaySource {
    /// Load a capture file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Replay`] for malformed rows; filesystem failures
    /// surface as [`Error::Io`].
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(&path)?;
        let reader = BufReader::new(file);
        let mut frames = VecDeque::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let fields: Vec<&str> = trimmed.split(',').collect();
            if line_number == 0 && fields[0].parse::<u64>().is_err() {
                // Header row
                continue;
            }
            frames.push_back(Self::parse_row(&fields, line_number + 1)?);
        }

        if frames.is_empty() {
            warn!("replay file {} holds no frames", path.as_ref().display());
        }
        Ok(Self { frames })
    }

    fn parse_row(fields: &[&str], line_number: usize) -> Result<TimedFrame> {
        if fields.len() < 65 {
            return Err(Error::Replay(format!(
                "line {line_number}: expected timestamp plus 64 cells, got {} fields",
                fields.len()
            )));
        }
        let millis: u64 = fields[0]
            .trim()
            .parse()
            .map_err(|_| Error::Replay(format!("line {line_number}: bad timestamp {:?}", fields[0])))?;

        let mut cells = [0.0_f32; 64];
        let pixel_fields = &fields[fields.len() - 64..];
        for (cell, field) in cells.iter_mut().zip(pixel_fields) {
            *cell = field
                .trim()
                .parse()
                .map_err(|_| Error::Replay(format!("line {line_number}: bad cell value {field:?}")))?;
        }
        let grid = frame_from_celsius(&cells)
            .map_err(|e| Error::Replay(format!("line {line_number}: {e}")))?;

        Ok(TimedFrame {
            wall_clock: UNIX_EPOCH + Duration::from_millis(millis),
            grid,
        })
    }

    /// Frames remaining to replay.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>> {
        Ok(self.frames.pop_front())
    }
}
