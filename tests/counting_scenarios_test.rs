//! End-to-end counting scenarios over synthetic frame streams


use people_counter::config::{Config, EntrancePolarity};
use people_counter::frame::Frame;
use people_counter::tracker::Direction;
use test_helpers::{
    add_patch, ambient_frame, calibrated_pipeline, fast_config, left_to_right, mirror,
    patch_frame, right_to_left, run_stream, run_stream_open, sweep_frames, tally, AMBIENT_C,
};

#[test]
fn test_empty_stream_stays_quiet() {
    let mut config = Config::default();
    config.background.calibration_frames = 250;
    let mut pipeline = calibrated_pipeline(&config);

    let frames = vec![ambient_frame(AMBIENT_C); 750];
    let events = run_stream(&mut pipeline, &frames);

    assert!(events.is_empty());
    let counter = tally(&events);
    assert_eq!(counter.occupancy(), 0);

    let background = pipeline.background().unwrap();
    for value in background.iter() {
        assert!((value - AMBIENT_C).abs() < 1e-6);
    }
}

#[test]
fn test_single_walker_left_to_right() {
    let mut pipeline = calibrated_pipeline(&fast_config());
    let frames = sweep_frames((2, 3), &left_to_right(), 4.0);
    let events = run_stream(&mut pipeline, &frames);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Entrance);
    assert_eq!(events[0].track_id, 1);
    assert_eq!(tally(&events).occupancy(), 1);
}

#[test]
fn test_sequential_exit_then_entrance() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    let mut frames = sweep_frames((2, 3), &right_to_left(), 4.0);
    frames.extend(sweep_frames((2, 3), &left_to_right(), 4.0));
    let events = run_stream(&mut pipeline, &frames);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].direction, Direction::Exit);
    assert_eq!(events[0].track_id, 1);
    assert_eq!(events[1].direction, Direction::Entrance);
    assert_eq!(events[1].track_id, 2);

    let counter = tally(&events);
    assert_eq!(counter.entrances(), 1);
    assert_eq!(counter.exits(), 1);
    assert_eq!(counter.occupancy(), 0);
}

#[test]
fn test_loitering_emits_nothing() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    let mut frames = vec![patch_frame((2, 3), (3, 4), 4.0); 60];
    frames.extend(vec![ambient_frame(AMBIENT_C); 6]);
    let events = run_stream(&mut pipeline, &frames);

    assert!(events.is_empty());
}

#[test]
fn test_two_abreast_count_twice() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    // Two bodies side by side, lateral rows 1-2 and 5-6, crossing together
    let frames: Vec<Frame> = {
        let mut frames: Vec<Frame> = left_to_right()
            .into_iter()
            .map(|col| {
                let mut frame = ambient_frame(AMBIENT_C);
                add_patch(&mut frame, (1, 2), (col, col + 1), 4.0);
                add_patch(&mut frame, (5, 6), (col, col + 1), 4.0);
                frame
            })
            .collect();
        frames.extend(vec![ambient_frame(AMBIENT_C); 5]);
        frames
    };
    let events = run_stream(&mut pipeline, &frames);

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.direction == Direction::Entrance));
    assert_eq!(events[0].track_id, 1);
    assert_eq!(events[1].track_id, 2);
    assert_eq!(tally(&events).occupancy(), 2);
}

/// Two walkers entering from opposite sides, merging into one blob around
/// the middle columns and separating again on the far sides.
fn merge_split_frames() -> Vec<Frame> {
    // Walker A: rows 2-3 moving right, peak at its top-left cell.
    // Walker B: rows 4-5 moving left, peak at its bottom-right cell.
    let a_cols = [-1, 0, 1, 2, 3, 3, 4, 5, 6, 7];
    let b_cols = [6, 5, 4, 3, 3, 3, 2, 1, 0, -1];

    let mut frames = Vec::new();
    for (&a, &b) in a_cols.iter().zip(&b_cols) {
        let mut frame = ambient_frame(AMBIENT_C);
        add_patch(&mut frame, (2, 3), (a, a + 1), 4.2);
        if (0..8).contains(&a) {
            frame[(2, a as usize)] += 0.4;
        }
        add_patch(&mut frame, (4, 5), (b, b + 1), 3.4);
        if (0..8).contains(&(b + 1)) {
            frame[(5, (b + 1) as usize)] += 0.4;
        }
        frames.push(frame);
    }
    frames.extend(vec![ambient_frame(AMBIENT_C); 6]);
    frames
}

#[test]
fn test_merge_split_keeps_identities() {
    let mut pipeline = calibrated_pipeline(&fast_config());
    let events = run_stream(&mut pipeline, &merge_split_frames());

    assert_eq!(events.len(), 2);
    let entrances = events.iter().filter(|e| e.direction == Direction::Entrance).count();
    let exits = events.iter().filter(|e| e.direction == Direction::Exit).count();
    assert_eq!(entrances, 1);
    assert_eq!(exits, 1);

    let counter = tally(&events);
    assert_eq!(counter.entrances(), 1);
    assert_eq!(counter.exits(), 1);
    assert_eq!(counter.occupancy(), 0);
}

#[test]
fn test_partial_crossing_emits_nothing() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    // Walks in to the middle, turns around, and leaves the way it came
    let offsets: Vec<i32> = (-1..=3).chain((-1..=2).rev()).collect();
    let events = run_stream(&mut pipeline, &sweep_frames((2, 3), &offsets, 4.0));

    assert!(events.is_empty());
}

#[test]
fn test_polarity_inversion_swaps_directions() {
    let mut config = fast_config();
    config.tracking.entrance_polarity = EntrancePolarity::NegativeAxis;
    let mut pipeline = calibrated_pipeline(&config);

    let events = run_stream(&mut pipeline, &sweep_frames((2, 3), &left_to_right(), 4.0));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Exit);
}

#[test]
fn test_mirrored_axis_swaps_directions() {
    let frames = sweep_frames((2, 3), &left_to_right(), 4.0);
    let mirrored: Vec<Frame> = frames.iter().map(mirror).collect();

    let mut pipeline = calibrated_pipeline(&fast_config());
    let events = run_stream(&mut pipeline, &mirrored);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Exit);
}

#[test]
fn test_mirrored_axis_with_inverted_polarity_preserves_everything() {
    let frames = merge_split_frames();
    let mirrored: Vec<Frame> = frames.iter().map(mirror).collect();

    let mut pipeline = calibrated_pipeline(&fast_config());
    let baseline = run_stream(&mut pipeline, &frames);

    let mut config = fast_config();
    config.tracking.entrance_polarity = EntrancePolarity::NegativeAxis;
    let mut pipeline = calibrated_pipeline(&config);
    let transformed = run_stream(&mut pipeline, &mirrored);

    let directions = |events: &[people_counter::tracker::CrossingEvent]| {
        let mut dirs: Vec<Direction> = events.iter().map(|e| e.direction).collect();
        dirs.sort_by_key(|d| *d == Direction::Exit);
        dirs
    };
    assert_eq!(directions(&baseline), directions(&transformed));

    let baseline_counter = tally(&baseline);
    let transformed_counter = tally(&transformed);
    assert_eq!(baseline_counter.entrances(), transformed_counter.entrances());
    assert_eq!(baseline_counter.exits(), transformed_counter.exits());
    assert_eq!(baseline_counter.occupancy(), transformed_counter.occupancy());
}

#[test]
fn test_stop_flushes_mid_crossing_track() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    // A full crossing with no trailing empty frames: the track is still
    // alive when the host stops the pipeline
    let frames: Vec<Frame> = left_to_right()
        .into_iter()
        .map(|col| patch_frame((2, 3), (col, col + 1), 4.0))
        .collect();
    let live_events = run_stream_open(&mut pipeline, &frames, 0);
    assert!(live_events.is_empty());

    let flushed = pipeline.stop(std::time::UNIX_EPOCH);
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].direction, Direction::Entrance);
}

#[test]
fn test_recalibrate_forgets_walkers() {
    let mut pipeline = calibrated_pipeline(&fast_config());

    // Half a crossing, then a recalibration request
    let frames: Vec<Frame> = (-1..=3)
        .map(|col| patch_frame((2, 3), (col, col + 1), 4.0))
        .collect();
    run_stream_open(&mut pipeline, &frames, 0);
    pipeline.recalibrate();
    assert!(pipeline.is_calibrating());

    // The doorway is empty again; recalibrate and watch a clean crossing
    for tick in 0..10 {
        pipeline
            .step(
                std::time::UNIX_EPOCH + test_helpers::frame_tick(100 + tick),
                &ambient_frame(AMBIENT_C),
            )
            .unwrap();
    }
    assert!(!pipeline.is_calibrating());

    let events = run_stream(&mut pipeline, &sweep_frames((2, 3), &left_to_right(), 4.0));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Entrance);
}
