//! Configuration management for the people counting pipeline

use crate::constants::{
    DEFAULT_ACTIVITY_THRESHOLD_C, DEFAULT_ADAPTIVE_ALPHA, DEFAULT_CALIBRATION_FRAMES,
    DEFAULT_FRAME_HZ, DEFAULT_MAX_BODY_CELLS, DEFAULT_MAX_MISSES, DEFAULT_MIN_BODY_CELLS,
    DEFAULT_MIN_CONFIRM_SAMPLES, DEFAULT_MIN_CROSSING_SPAN, DEFAULT_MIN_PEAK_SEPARATION,
    DEFAULT_OTSU_MAX_FOREGROUND_FRACTION, DEFAULT_OTSU_MIN_CLASS_SEPARATION_C,
    DEFAULT_SINGLE_BODY_CELLS, DEFAULT_SPATIAL_DISTANCE_THRESHOLD, DEFAULT_SPATIAL_WEIGHT,
    DEFAULT_STALL_GRACE_PERIODS, DEFAULT_TEMPERATURE_DISTANCE_THRESHOLD,
    DEFAULT_TEMPERATURE_WEIGHT, DEFAULT_TRACKING_TEMP_THRESHOLD_C, GRID_SIZE, TOTAL_CELLS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sensor timing configuration
    pub sensor: SensorConfig,

    /// Background model configuration
    pub background: BackgroundConfig,

    /// Foreground discrimination configuration
    pub foreground: ForegroundConfig,

    /// Body extraction configuration
    pub bodies: BodyConfig,

    /// Tracking and counting configuration
    pub tracking: TrackingConfig,
}

/// Sensor timing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Nominal sensor rate in Hz
    pub frame_hz: f64,

    /// Stall grace window as a multiple of the nominal frame period
    pub stall_grace_periods: f64,
}

/// Background model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Calibration window length in frames
    pub calibration_frames: usize,

    /// EWMA weight for the adaptive phase
    pub adaptive_alpha: f32,
}

/// Foreground discrimination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForegroundConfig {
    /// Gate A: minimum peak temperature excess for any activity (Celsius)
    pub activity_threshold_c: f32,

    /// Gate B: minimum separation between the Otsu class means (Celsius)
    pub otsu_min_class_separation_c: f32,

    /// Gate B: largest grid fraction the warm class may cover
    pub otsu_max_foreground_fraction: f32,

    /// Gate C: minimum temperature excess for a tracked cell (Celsius)
    pub tracking_temp_threshold_c: f32,
}

/// Body extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Smallest cell count accepted as a body
    pub min_body_cells: usize,

    /// Largest cell count accepted as a body
    pub max_body_cells: usize,

    /// Cell count above which a component is considered for splitting
    pub single_body_cells: usize,

    /// Minimum Chebyshev distance between split peaks, in cells
    pub min_peak_separation: usize,
}

/// Tracking and counting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Largest spatial distance accepted when matching, in cells
    pub spatial_distance_threshold: f32,

    /// Largest mean-temperature difference accepted when matching (Celsius)
    pub temperature_distance_threshold: f32,

    /// Weight of the spatial term in the matching cost
    pub spatial_weight: f32,

    /// Weight of the temperature term in the matching cost
    pub temperature_weight: f32,

    /// Trajectory samples required before a track is confirmed
    pub min_confirm_samples: usize,

    /// Consecutive misses tolerated before a track dies
    pub max_misses: u32,

    /// Minimum traversal-axis span for a countable crossing, in cells
    pub min_crossing_span: f32,

    /// Which traversal direction counts as an entrance
    pub entrance_polarity: EntrancePolarity,
}

/// Mapping between traversal-axis sign and the entrance label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrancePolarity {
    /// Motion toward increasing column index is an entrance
    PositiveAxis,
    /// Motion toward decreasing column index is an entrance
    NegativeAxis,
}

impl EntrancePolarity {
    /// The opposite polarity.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::PositiveAxis => Self::NegativeAxis,
            Self::NegativeAxis => Self::PositiveAxis,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            background: BackgroundConfig::default(),
            foreground: ForegroundConfig::default(),
            bodies: BodyConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            frame_hz: DEFAULT_FRAME_HZ,
            stall_grace_periods: DEFAULT_STALL_GRACE_PERIODS,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            calibration_frames: DEFAULT_CALIBRATION_FRAMES,
            adaptive_alpha: DEFAULT_ADAPTIVE_ALPHA,
        }
    }
}

impl Default for ForegroundConfig {
    fn default() -> Self {
        Self {
            activity_threshold_c: DEFAULT_ACTIVITY_THRESHOLD_C,
            otsu_min_class_separation_c: DEFAULT_OTSU_MIN_CLASS_SEPARATION_C,
            otsu_max_foreground_fraction: DEFAULT_OTSU_MAX_FOREGROUND_FRACTION,
            tracking_temp_threshold_c: DEFAULT_TRACKING_TEMP_THRESHOLD_C,
        }
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            min_body_cells: DEFAULT_MIN_BODY_CELLS,
            max_body_cells: DEFAULT_MAX_BODY_CELLS,
            single_body_cells: DEFAULT_SINGLE_BODY_CELLS,
            min_peak_separation: DEFAULT_MIN_PEAK_SEPARATION,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            spatial_distance_threshold: DEFAULT_SPATIAL_DISTANCE_THRESHOLD,
            temperature_distance_threshold: DEFAULT_TEMPERATURE_DISTANCE_THRESHOLD,
            spatial_weight: DEFAULT_SPATIAL_WEIGHT,
            temperature_weight: DEFAULT_TEMPERATURE_WEIGHT,
            min_confirm_samples: DEFAULT_MIN_CONFIRM_SAMPLES,
            max_misses: DEFAULT_MAX_MISSES,
            min_crossing_span: DEFAULT_MIN_CROSSING_SPAN,
            entrance_polarity: EntrancePolarity::PositiveAxis,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Nominal frame period derived from the configured rate
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sensor.frame_hz)
    }

    /// Grace window after which the sensor counts as stalled
    #[must_use]
    pub fn stall_grace(&self) -> Duration {
        Duration::from_secs_f64(self.sensor.stall_grace_periods / self.sensor.frame_hz)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any out-of-range value. Validation is
    /// fatal at startup; a pipeline is never built from an invalid config.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.frame_hz <= 0.0 || !self.sensor.frame_hz.is_finite() {
            return Err(Error::Config("frame_hz must be positive".to_string()));
        }
        if self.sensor.stall_grace_periods < 1.0 {
            return Err(Error::Config(
                "stall_grace_periods must be at least 1 frame period".to_string(),
            ));
        }

        if self.background.calibration_frames == 0 {
            return Err(Error::Config("calibration_frames must be greater than 0".to_string()));
        }
        if !(self.background.adaptive_alpha > 0.0 && self.background.adaptive_alpha <= 1.0) {
            return Err(Error::Config("adaptive_alpha must be in (0, 1]".to_string()));
        }

        if self.foreground.activity_threshold_c <= 0.0 {
            return Err(Error::Config("activity_threshold_c must be positive".to_string()));
        }
        if self.foreground.otsu_min_class_separation_c <= 0.0 {
            return Err(Error::Config(
                "otsu_min_class_separation_c must be positive".to_string(),
            ));
        }
        if !(self.foreground.otsu_max_foreground_fraction > 0.0
            && self.foreground.otsu_max_foreground_fraction < 1.0)
        {
            return Err(Error::Config(
                "otsu_max_foreground_fraction must be in (0, 1)".to_string(),
            ));
        }
        if self.foreground.tracking_temp_threshold_c <= 0.0 {
            return Err(Error::Config("tracking_temp_threshold_c must be positive".to_string()));
        }

        if self.bodies.min_body_cells == 0 {
            return Err(Error::Config("min_body_cells must be greater than 0".to_string()));
        }
        if self.bodies.min_body_cells > self.bodies.single_body_cells {
            return Err(Error::Config(
                "min_body_cells must not exceed single_body_cells".to_string(),
            ));
        }
        if self.bodies.single_body_cells > self.bodies.max_body_cells {
            return Err(Error::Config(
                "single_body_cells must not exceed max_body_cells".to_string(),
            ));
        }
        if self.bodies.max_body_cells > TOTAL_CELLS {
            return Err(Error::Config(format!("max_body_cells must not exceed {TOTAL_CELLS}")));
        }
        if self.bodies.min_peak_separation == 0 {
            return Err(Error::Config("min_peak_separation must be greater than 0".to_string()));
        }

        if self.tracking.spatial_distance_threshold <= 0.0 {
            return Err(Error::Config(
                "spatial_distance_threshold must be positive".to_string(),
            ));
        }
        if self.tracking.temperature_distance_threshold <= 0.0 {
            return Err(Error::Config(
                "temperature_distance_threshold must be positive".to_string(),
            ));
        }
        if self.tracking.spatial_weight < 0.0 || self.tracking.temperature_weight < 0.0 {
            return Err(Error::Config("matching weights must be non-negative".to_string()));
        }
        if self.tracking.min_confirm_samples < 2 {
            return Err(Error::Config("min_confirm_samples must be at least 2".to_string()));
        }
        if !(self.tracking.min_crossing_span > 0.0
            && self.tracking.min_crossing_span < GRID_SIZE as f32)
        {
            return Err(Error::Config(format!(
                "min_crossing_span must be in (0, {GRID_SIZE})"
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# People Counter Configuration

# Sensor timing
sensor:
  frame_hz: 10.0
  stall_grace_periods: 3.0

# Background model
background:
  calibration_frames: 250
  adaptive_alpha: 0.01

# Foreground discrimination gates
foreground:
  activity_threshold_c: 0.25
  otsu_min_class_separation_c: 0.75
  otsu_max_foreground_fraction: 0.60
  tracking_temp_threshold_c: 0.25

# Body extraction
bodies:
  min_body_cells: 2
  max_body_cells: 20
  single_body_cells: 8
  min_peak_separation: 2

# Tracking and counting
tracking:
  spatial_distance_threshold: 3.0
  temperature_distance_threshold: 1.5
  spatial_weight: 1.0
  temperature_weight: 1.0
  min_confirm_samples: 3
  max_misses: 3
  min_crossing_span: 4.0
  entrance_polarity: positive_axis
"#;
