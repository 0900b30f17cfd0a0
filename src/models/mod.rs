//! Data model for the watermark: configuration records and error types

pub mod config;
pub mod errors;

pub use config::*;
pub use errors::{Axis, Result, WatermarkError};
