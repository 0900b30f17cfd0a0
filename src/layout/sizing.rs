//! Canvas sizing
//!
//! Resolves declared width/height into logical pixels and derives the canvas
//! size for one tile. Rotating a block of text grows its bounding box, so the
//! auto sizes add `sin(|angle|)` worth of extra room on each axis.

use super::abs_sin_deg;
use super::text::count_lines;
use crate::models::{Axis, Dimension, Spacing, WatermarkError};

/// Resolve the tile width. `Fixed` values are expected to be ratio-scaled already.
pub fn resolve_width<F>(
    width: &Dimension,
    text: &str,
    line_height: f64,
    angle: f64,
    measure: F,
) -> Result<f64, WatermarkError>
where
    F: Fn(&str) -> f64,
{
    match width {
        Dimension::Fixed(value) => Ok(*value),
        Dimension::Auto => Ok(measure(text) + line_height * abs_sin_deg(angle)),
        Dimension::Invalid(raw) => Err(WatermarkError::InvalidDimension {
            axis: Axis::Width,
            value: raw.clone(),
        }),
    }
}

/// Resolve the tile height against an already resolved `width`
pub fn resolve_height<F>(
    height: &Dimension,
    text: &str,
    width: f64,
    line_height: f64,
    angle: f64,
    measure: F,
) -> Result<f64, WatermarkError>
where
    F: Fn(&str) -> f64,
{
    match height {
        Dimension::Fixed(value) => Ok(*value),
        Dimension::Auto => {
            let lines = count_lines(text, width, measure);
            Ok(line_height * lines as f64 + width * abs_sin_deg(angle))
        }
        Dimension::Invalid(raw) => Err(WatermarkError::InvalidDimension {
            axis: Axis::Height,
            value: raw.clone(),
        }),
    }
}

/// Width first, then height (auto height wraps against the resolved width)
pub fn resolve_dimensions<F>(
    width: &Dimension,
    height: &Dimension,
    text: &str,
    line_height: f64,
    angle: f64,
    measure: F,
) -> Result<(f64, f64), WatermarkError>
where
    F: Fn(&str) -> f64,
{
    let w = resolve_width(width, text, line_height, angle, &measure)?;
    let h = resolve_height(height, text, w, line_height, angle, &measure)?;
    Ok((w, h))
}

/// Size of one tile, logical and physical
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    /// `width + spacing.x`
    pub tile_width: f64,
    /// `height + spacing.y`
    pub tile_height: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub device_pixel_ratio: f64,
}

/// Canvas for one tile including its spacing, scaled by the device pixel ratio.
/// A missing or nonsensical ratio counts as 1.
pub fn canvas_size(width: f64, height: f64, spacing: Spacing, device_pixel_ratio: f64) -> CanvasSize {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let tile_width = width + spacing.x;
    let tile_height = height + spacing.y;

    CanvasSize {
        tile_width,
        tile_height,
        pixel_width: to_pixels(tile_width * dpr),
        pixel_height: to_pixels(tile_height * dpr),
        device_pixel_ratio: dpr,
    }
}

// canvas dimensions truncate toward zero
fn to_pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}
