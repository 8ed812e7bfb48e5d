//! Multi-object tracking and crossing classification.
//!
//! Associates detections across frames into tracks, maintains per-track
//! trajectories, and emits a directional crossing event when a qualifying
//! track dies. Prediction is last-position-plus-velocity; the grid is far
//! too coarse for a Kalman filter to earn its keep, and greedy matching is
//! exact enough for at most two bodies abreast.

use crate::config::{EntrancePolarity, TrackingConfig};
use crate::constants::{AXIS_CENTER, GRID_SIZE};
use crate::extractor::Detection;
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Lifecycle state of a live track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Newly born, not yet enough trajectory to count
    Provisional,
    /// Enough trajectory samples to qualify for counting
    Confirmed,
    /// Unmatched in the last frame(s), awaiting re-acquisition or death
    Dying,
}

/// Direction of a completed crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Entrance,
    Exit,
}

/// One directional crossing, emitted at most once per track
#[derive(Debug, Clone)]
pub struct CrossingEvent {
    pub track_id: u64,
    pub direction: Direction,
    pub wall_clock: SystemTime,
    pub frame_index: u64,
}

/// A persistent hypothesis about one person
#[derive(Debug, Clone)]
pub struct Track {
    pub id: u64,
    state: TrackState,
    /// (frame_index, centroid) samples, strictly increasing in frame index
    trajectory: Vec<(u64, Point2<f32>)>,
    last_seen: u64,
    last_centroid: Point2<f32>,
    last_mean_temp: f32,
    misses: u32,
    counted: bool,
    ever_confirmed: bool,
}

impl Track {
    fn new(id: u64, frame_index: u64, detection: &Detection) -> Self {
        Self {
            id,
            state: TrackState::Provisional,
            trajectory: vec![(frame_index, detection.centroid)],
            last_seen: frame_index,
            last_centroid: detection.centroid,
            last_mean_temp: detection.mean_temp,
            misses: 0,
            counted: false,
            ever_confirmed: false,
        }
    }

    /// Position expected this frame: last centroid advanced by the
    /// velocity of the last two samples (zero velocity with one sample).
    fn predicted(&self) -> Point2<f32> {
        let n = self.trajectory.len();
        if n < 2 {
            return self.last_centroid;
        }
        let velocity: Vector2<f32> = self.trajectory[n - 1].1 - self.trajectory[n - 2].1;
        self.last_centroid + velocity
    }

    fn extend(&mut self, frame_index: u64, detection: &Detection, min_confirm_samples: usize) {
        self.trajectory.push((frame_index, detection.centroid));
        self.last_seen = frame_index;
        self.last_centroid = detection.centroid;
        self.last_mean_temp = detection.mean_temp;
        self.misses = 0;
        if self.trajectory.len() >= min_confirm_samples {
            self.state = TrackState::Confirmed;
            self.ever_confirmed = true;
        } else {
            self.state = TrackState::Provisional;
        }
    }

    /// Extent of the trajectory's projection on the traversal axis.
    fn crossing_span(&self) -> f32 {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &(_, point) in &self.trajectory {
            min = min.min(point.x);
            max = max.max(point.x);
        }
        max - min
    }

    #[must_use]
    pub fn state(&self) -> TrackState {
        self.state
    }

    #[must_use]
    pub fn trajectory(&self) -> &[(u64, Point2<f32>)] {
        &self.trajectory
    }

    #[must_use]
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

/// Owns all live tracks and turns track deaths into crossing events
#[derive(Debug)]
pub struct Tracker {
    spatial_threshold: f32,
    temperature_threshold: f32,
    spatial_weight: f32,
    temperature_weight: f32,
    min_confirm_samples: usize,
    max_misses: u32,
    min_crossing_span: f32,
    polarity: EntrancePolarity,
    tracks: BTreeMap<u64, Track>,
    next_id: u64,
}

impl Tracker {
    #[must_use]
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            spatial_threshold: config.spatial_distance_threshold,
            temperature_threshold: config.temperature_distance_threshold,
            spatial_weight: config.spatial_weight,
            temperature_weight: config.temperature_weight,
            min_confirm_samples: config.min_confirm_samples,
            max_misses: config.max_misses,
            min_crossing_span: config.min_crossing_span,
            polarity: config.entrance_polarity,
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Live tracks in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Advance one frame: match, extend, miss, spawn, and reap.
    ///
    /// Events for the frame are returned in ascending track id order.
    pub fn step(
        &mut self,
        frame_index: u64,
        wall_clock: SystemTime,
        detections: &[Detection],
    ) -> Vec<CrossingEvent> {
        // Predict, then gate and cost every track/detection pair
        let predictions: Vec<(u64, Point2<f32>, f32)> = self
            .tracks
            .values()
            .map(|t| (t.id, t.predicted(), t.last_mean_temp))
            .collect();

        let mut candidates: Vec<(f32, u64, usize)> = Vec::new();
        for &(id, predicted, last_temp) in &predictions {
            for (det_index, detection) in detections.iter().enumerate() {
                let spatial = (predicted - detection.centroid).norm();
                let thermal = (last_temp - detection.mean_temp).abs();
                if spatial > self.spatial_threshold || thermal > self.temperature_threshold {
                    continue;
                }
                let cost = self.spatial_weight * spatial + self.temperature_weight * thermal;
                candidates.push((cost, id, det_index));
            }
        }
        // Greedy: smallest cost first, ties by lower track id for determinism
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut matched_tracks: BTreeMap<u64, usize> = BTreeMap::new();
        let mut claimed_detections = vec![false; detections.len()];
        for (_, id, det_index) in candidates {
            if matched_tracks.contains_key(&id) || claimed_detections[det_index] {
                continue;
            }
            matched_tracks.insert(id, det_index);
            claimed_detections[det_index] = true;
        }

        // Extend matched tracks, age the rest
        let mut dead: Vec<u64> = Vec::new();
        for track in self.tracks.values_mut() {
            if let Some(&det_index) = matched_tracks.get(&track.id) {
                track.extend(frame_index, &detections[det_index], self.min_confirm_samples);
                continue;
            }
            track.misses += 1;
            track.state = TrackState::Dying;
            if outside_grid(track.predicted()) {
                // Walked off the edge: die now, classification still runs
                dead.push(track.id);
            } else if track.misses > self.max_misses {
                dead.push(track.id);
            }
        }

        // Births for unclaimed detections
        for (det_index, detection) in detections.iter().enumerate() {
            if !claimed_detections[det_index] {
                let track = Track::new(self.next_id, frame_index, detection);
                debug!(
                    "track {} born at ({:.2}, {:.2})",
                    track.id, detection.centroid.x, detection.centroid.y
                );
                self.tracks.insert(track.id, track);
                self.next_id += 1;
            }
        }

        // Deaths, ascending id; dead tracks leave the table immediately
        let mut events = Vec::new();
        for id in dead {
            let Some(mut track) = self.tracks.remove(&id) else {
                continue;
            };
            if let Some(event) = self.classify_death(&mut track, frame_index, wall_clock) {
                events.push(event);
            }
        }
        events
    }

    /// Flush every live track as if it died this frame. Used on shutdown.
    pub fn flush(&mut self, frame_index: u64, wall_clock: SystemTime) -> Vec<CrossingEvent> {
        let ids: Vec<u64> = self.tracks.keys().copied().collect();
        let mut events = Vec::new();
        for id in ids {
            let Some(mut track) = self.tracks.remove(&id) else {
                continue;
            };
            if let Some(event) = self.classify_death(&mut track, frame_index, wall_clock) {
                events.push(event);
            }
        }
        events
    }

    /// Drop every live track without classification (recalibration).
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Run the direction classifier for a dying track; `None` means the
    /// track dies silently (noise, loitering, partial crossing).
    fn classify_death(
        &self,
        track: &mut Track,
        frame_index: u64,
        wall_clock: SystemTime,
    ) -> Option<CrossingEvent> {
        if track.counted {
            return None;
        }
        let direction = self.classify(track)?;
        track.counted = true;
        info!(
            "track {} died after {} samples: {:?}",
            track.id,
            track.trajectory.len(),
            direction
        );
        Some(CrossingEvent {
            track_id: track.id,
            direction,
            wall_clock,
            frame_index,
        })
    }

    fn classify(&self, track: &Track) -> Option<Direction> {
        if !track.ever_confirmed {
            return None;
        }
        if track.crossing_span() < self.min_crossing_span {
            return None;
        }

        let first = track.trajectory.first()?.1.x;
        let last = track.trajectory.last()?.1.x;
        let opposite_halves =
            (first < AXIS_CENTER && last > AXIS_CENTER) || (first > AXIS_CENTER && last < AXIS_CENTER);
        if !opposite_halves {
            return None;
        }

        let positive = last > first;
        let direction = match (positive, self.polarity) {
            (true, EntrancePolarity::PositiveAxis) | (false, EntrancePolarity::NegativeAxis) => {
                Direction::Entrance
            }
            (true, EntrancePolarity::NegativeAxis) | (false, EntrancePolarity::PositiveAxis) => {
                Direction::Exit
            }
        };
        Some(direction)
    }
}

/// Whether a predicted position has left the sensor's field of view.
fn outside_grid(point: Point2<f32>) -> bool {
    let limit = GRID_SIZE as f32 - 1.0;
    point.x < 0.0 || point.y < 0.0 || point.x > limit || point.y > limit
}
