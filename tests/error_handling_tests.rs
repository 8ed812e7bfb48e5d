//! Error handling and persistence behavior across the crate surface


use people_counter::background::BackgroundModel;
use people_counter::config::Config;
use people_counter::frame::frame_from_celsius;
use people_counter::pipeline::Pipeline;
use people_counter::source::{FrameSource, ReplaySource};
use people_counter::Error;
use std::io::Write;
use std::time::UNIX_EPOCH;
use test_helpers::{ambient_frame, calibrated_pipeline, fast_config, run_stream, sweep_frames, AMBIENT_C};

#[test]
fn test_config_errors_are_fatal_at_construction() {
    let mut config = Config::default();
    config.tracking.spatial_distance_threshold = -1.0;

    match Pipeline::new(&config) {
        Err(Error::Config(message)) => assert!(message.contains("spatial_distance_threshold")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.yaml");

    let mut config = Config::default();
    config.background.calibration_frames = 42;
    config.to_file(&path).unwrap();

    let restored = Config::from_file(&path).unwrap();
    assert_eq!(restored.background.calibration_frames, 42);
    assert!(restored.validate().is_ok());
}

#[test]
fn test_config_file_with_bad_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "background: [this, is, not, a, map]").unwrap();

    assert!(matches!(Config::from_file(&path), Err(Error::Config(_))));
}

#[test]
fn test_invalid_frames_do_not_stall_calibration() {
    let mut pipeline = Pipeline::new(&fast_config()).unwrap();
    let good = ambient_frame(AMBIENT_C);
    let mut bad = good;
    bad[(2, 2)] = f32::NAN;

    // Interleave bad frames through the whole calibration window
    for _ in 0..10 {
        assert!(matches!(
            pipeline.step(UNIX_EPOCH, &bad),
            Err(Error::InvalidFrame(_))
        ));
        pipeline.step(UNIX_EPOCH, &good).unwrap();
    }
    assert!(!pipeline.is_calibrating());
}

#[test]
fn test_invalid_frame_mid_stream_drops_cleanly() {
    let mut pipeline = calibrated_pipeline(&fast_config());
    let mut bad = ambient_frame(AMBIENT_C);
    bad[(0, 7)] = f32::INFINITY;

    assert!(pipeline.step(UNIX_EPOCH, &bad).is_err());

    // The stream recovers: a full crossing still counts
    let events = run_stream(&mut pipeline, &sweep_frames((2, 3), &test_helpers::left_to_right(), 4.0));
    assert_eq!(events.len(), 1);
}

#[test]
fn test_background_persistence_roundtrip_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("background.bin");

    let pipeline = calibrated_pipeline(&fast_config());
    pipeline.save_background(&path).unwrap();

    // A second pipeline skips calibration entirely with the saved baseline
    let mut restored = Pipeline::new(&fast_config()).unwrap();
    restored.install_background(BackgroundModel::read_background(&path).unwrap());
    assert!(!restored.is_calibrating());

    let events = run_stream(&mut restored, &sweep_frames((2, 3), &test_helpers::left_to_right(), 4.0));
    assert_eq!(events.len(), 1);
}

#[test]
fn test_save_background_requires_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&fast_config()).unwrap();

    match pipeline.save_background(dir.path().join("background.bin")) {
        Err(Error::Calibration { collected, required }) => {
            assert_eq!(collected, 0);
            assert_eq!(required, 10);
        }
        other => panic!("expected calibration error, got {other:?}"),
    }
}

#[test]
fn test_replay_feeds_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.csv");
    let mut file = std::fs::File::create(&path).unwrap();

    // Ten calibration frames, then a crossing, as a capture log
    let mut frames = vec![ambient_frame(AMBIENT_C); 10];
    frames.extend(sweep_frames((2, 3), &test_helpers::left_to_right(), 4.0));
    for (index, frame) in frames.iter().enumerate() {
        let cells: Vec<String> = people_counter::frame::to_row_major(frame)
            .iter()
            .map(|v| format!("{v:.2}"))
            .collect();
        writeln!(file, "{},0,{}", 1000 + index * 100, cells.join(",")).unwrap();
    }
    drop(file);

    let mut source = ReplaySource::from_csv(&path).unwrap();
    let mut pipeline = Pipeline::new(&fast_config()).unwrap();
    let mut events = Vec::new();
    while let Some(timed) = source.next_frame().unwrap() {
        events.extend(pipeline.step(timed.wall_clock, &timed.grid).unwrap());
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, 1);
}

#[test]
fn test_frame_from_celsius_shape_errors() {
    assert!(matches!(
        frame_from_celsius(&vec![AMBIENT_C; 10]),
        Err(Error::InvalidFrame(_))
    ));

    let mut cells = vec![AMBIENT_C; 64];
    cells[40] = f32::NAN;
    assert!(matches!(frame_from_celsius(&cells), Err(Error::InvalidFrame(_))));

    assert!(frame_from_celsius(&vec![AMBIENT_C; 64]).is_ok());
}

#[test]
fn test_error_display_messages() {
    let error = Error::Calibration { collected: 3, required: 250 };
    assert_eq!(
        error.to_string(),
        "background calibration incomplete: 3/250 frames"
    );

    let error = Error::SensorStalled { grace_ms: 300 };
    assert_eq!(error.to_string(), "sensor stalled: no frame within 300 ms");
}

#[test]
fn test_mixed_valid_invalid_replay_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.csv");
    let cells: Vec<String> = (0..64).map(|_| "22.0".to_string()).collect();
    let row = format!("1000,0,{}", cells.join(","));
    std::fs::write(&path, format!("{row}\nnot,a,frame\n")).unwrap();

    assert!(matches!(ReplaySource::from_csv(&path), Err(Error::Replay(_))));
}
