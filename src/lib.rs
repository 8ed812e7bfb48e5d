pub mod background;
pub mod config;
pub mod constants;
pub mod counter;
pub mod error;
pub mod extractor;
pub mod foreground;
pub mod frame;
pub mod pipeline;
pub mod source;
pub mod tracker;

pub use error::{Error, Result};
