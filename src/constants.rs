//! Constants used throughout the library

/// Side length of the sensor grid in cells
pub const GRID_SIZE: usize = 8;

/// Total number of cells in one frame
pub const TOTAL_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Midpoint of the traversal axis, in cell coordinates
pub const AXIS_CENTER: f32 = (GRID_SIZE as f32 - 1.0) / 2.0;

/// Nominal sensor frame rate in Hz
pub const DEFAULT_FRAME_HZ: f64 = 10.0;

/// Stall grace window as a multiple of the nominal frame period
pub const DEFAULT_STALL_GRACE_PERIODS: f64 = 3.0;

/// Default calibration window length in frames (~25 s at 10 Hz)
pub const DEFAULT_CALIBRATION_FRAMES: usize = 250;

/// Default background EWMA weight
pub const DEFAULT_ADAPTIVE_ALPHA: f32 = 0.01;

/// Default presence gate thresholds, in degrees Celsius above background
pub const DEFAULT_ACTIVITY_THRESHOLD_C: f32 = 0.25;
pub const DEFAULT_OTSU_MIN_CLASS_SEPARATION_C: f32 = 0.75;
pub const DEFAULT_TRACKING_TEMP_THRESHOLD_C: f32 = 0.25;

/// Largest grid fraction the warm Otsu class may cover before the frame
/// is treated as an ambient shift rather than a person
pub const DEFAULT_OTSU_MAX_FOREGROUND_FRACTION: f32 = 0.60;

/// Default body size bounds in cells
pub const DEFAULT_MIN_BODY_CELLS: usize = 2;
pub const DEFAULT_MAX_BODY_CELLS: usize = 20;
pub const DEFAULT_SINGLE_BODY_CELLS: usize = 8;

/// Minimum Chebyshev distance between split peaks, in cells
pub const DEFAULT_MIN_PEAK_SEPARATION: usize = 2;

/// Default matching gates and cost weights
pub const DEFAULT_SPATIAL_DISTANCE_THRESHOLD: f32 = 3.0;
pub const DEFAULT_TEMPERATURE_DISTANCE_THRESHOLD: f32 = 1.5;
pub const DEFAULT_SPATIAL_WEIGHT: f32 = 1.0;
pub const DEFAULT_TEMPERATURE_WEIGHT: f32 = 1.0;

/// Default track lifecycle parameters
pub const DEFAULT_MIN_CONFIRM_SAMPLES: usize = 3;
pub const DEFAULT_MAX_MISSES: u32 = 3;
pub const DEFAULT_MIN_CROSSING_SPAN: f32 = 4.0;

/// Numeric precision epsilon
pub const EPSILON: f32 = 1e-6;
