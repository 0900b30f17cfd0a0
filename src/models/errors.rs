//! Error types for watermark rendering
//!
//! Every failure is handled where it happens: the controller turns these into a
//! `[Watermark]` warning plus a fallback value, so none of them reach JavaScript
//! as an exception.

use thiserror::Error;

/// Which side of the tile a dimension belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Width => f.write_str("width"),
            Axis::Height => f.write_str("height"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WatermarkError {
    /// width/height is neither numeric nor "auto"
    #[error("{axis} is not a number or 'auto' (got {value:?}). Please check your options.")]
    InvalidDimension { axis: Axis, value: String },

    /// Drawing surface or observation capability is missing in this environment
    #[error("{0} is not available in the current environment")]
    CapabilityUnavailable(&'static str),

    /// Selector or node did not resolve to an element
    #[error("target region {0:?} could not be resolved")]
    TargetUnresolved(String),

    /// The overlay exists but the host refused to detach it
    #[error("remove watermark dom [{id}] failed: {reason}")]
    RemovalFailure { id: String, reason: String },

    /// Any other host-side failure (a rejected DOM or canvas call)
    #[error("host error: {0}")]
    Host(String),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
