//! Occupancy bookkeeping driven by crossing events.

use crate::tracker::{CrossingEvent, Direction};
use log::info;

/// Receives crossing events synchronously from the pipeline step.
///
/// Called at most once per track, in ascending track id order within a
/// frame.
pub trait EventSink {
    fn on_event(&mut self, event: &CrossingEvent);
}

/// Running entrance/exit totals and the derived occupancy
#[derive(Debug, Clone, Default)]
pub struct OccupancyCounter {
    entrances: u64,
    exits: u64,
}

impl OccupancyCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entrances(&self) -> u64 {
        self.entrances
    }

    #[must_use]
    pub fn exits(&self) -> u64 {
        self.exits
    }

    /// Entrances minus exits, floored at zero.
    #[must_use]
    pub fn occupancy(&self) -> u64 {
        self.entrances.saturating_sub(self.exits)
    }

    /// Zero all counters.
    pub fn reset(&mut self) {
        self.entrances = 0;
        self.exits = 0;
        info!("occupancy counters reset");
    }
}

impl EventSink for OccupancyCounter {
    fn on_event(&mut self, event: &CrossingEvent) {
        match event.direction {
            Direction::Entrance => self.entrances += 1,
            Direction::Exit => self.exits += 1,
        }
        info!(
            "track {} {:?} at frame {}, occupancy {}",
            event.track_id,
            event.direction,
            event.frame_index,
            self.occupancy()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn event(track_id: u64, direction: Direction) -> CrossingEvent {
        CrossingEvent {
            track_id,
            direction,
            wall_clock: UNIX_EPOCH,
            frame_index: 0,
        }
    }

    #[test]
    fn test_occupancy_tracks_events() {
        let mut counter = OccupancyCounter::new();
        counter.on_event(&event(1, Direction::Entrance));
        counter.on_event(&event(2, Direction::Entrance));
        counter.on_event(&event(3, Direction::Exit));

        assert_eq!(counter.entrances(), 2);
        assert_eq!(counter.exits(), 1);
        assert_eq!(counter.occupancy(), 1);
    }

    #[test]
    fn test_occupancy_floors_at_zero() {
        let mut counter = OccupancyCounter::new();
        counter.on_event(&event(1, Direction::Exit));
        assert_eq!(counter.occupancy(), 0);

        counter.on_event(&event(2, Direction::Entrance));
        // Still entrances minus exits, not a clamped running total
        assert_eq!(counter.occupancy(), 0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut counter = OccupancyCounter::new();
        counter.on_event(&event(1, Direction::Entrance));
        counter.reset();

        assert_eq!(counter.entrances(), 0);
        assert_eq!(counter.exits(), 0);
        assert_eq!(counter.occupancy(), 0);
    }
}
