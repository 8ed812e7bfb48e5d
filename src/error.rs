//! Error types for the people counting library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Frame contains non-finite values or has the wrong shape
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Background requested before the calibration window completed
    #[error("background calibration incomplete: {collected}/{required} frames")]
    Calibration { collected: usize, required: usize },

    /// Out-of-range configuration rejected at construction time
    #[error("configuration error: {0}")]
    Config(String),

    /// The frame source delivered nothing within the grace window
    #[error("sensor stalled: no frame within {grace_ms} ms")]
    SensorStalled { grace_ms: u64 },

    /// Malformed replay data
    #[error("replay error: {0}")]
    Replay(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
