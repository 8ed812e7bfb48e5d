//! Doorway people counter, replaying captured 8x8 thermal frames.

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn};
use people_counter::background::BackgroundModel;
use people_counter::config::{Config, EXAMPLE_CONFIG};
use people_counter::counter::{EventSink, OccupancyCounter};
use people_counter::pipeline::Pipeline;
use people_counter::source::{FrameSource, ReplaySource};
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Captured frame CSV to replay through the pipeline
    #[arg(short, long, required_unless_present = "print_config")]
    replay: Option<PathBuf>,

    /// Persisted background file to load, skipping calibration
    #[arg(long)]
    background: Option<PathBuf>,

    /// Save the calibrated background to this file
    #[arg(long)]
    save_background: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;

    let mut pipeline = Pipeline::new(&config)?;
    if let Some(path) = &args.background {
        pipeline.install_background(BackgroundModel::read_background(path)?);
        info!("loaded background from {}", path.display());
    }

    let Some(replay_path) = &args.replay else {
        bail!("a replay file is required");
    };
    let mut source = ReplaySource::from_csv(replay_path)?;
    info!("replaying {} frames from {}", source.len(), replay_path.display());

    let mut counter = OccupancyCounter::new();
    let mut background_saved = false;
    let mut dropped_frames = 0_u64;

    while let Some(frame) = source.next_frame()? {
        match pipeline.step(frame.wall_clock, &frame.grid) {
            Ok(events) => {
                for event in &events {
                    counter.on_event(event);
                }
            }
            Err(e) => {
                dropped_frames += 1;
                warn!("frame dropped: {e}");
            }
        }

        if !pipeline.is_calibrating() && !background_saved {
            if let Some(path) = &args.save_background {
                pipeline.save_background(path)?;
            }
            background_saved = true;
        }
    }

    for event in pipeline.stop(SystemTime::now()) {
        counter.on_event(&event);
    }

    if dropped_frames > 0 {
        warn!("{dropped_frames} invalid frames dropped during replay");
    }

    println!(
        "entrances: {}  exits: {}  occupancy: {}",
        counter.entrances(),
        counter.exits(),
        counter.occupancy()
    );

    Ok(())
}
