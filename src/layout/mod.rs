//! Tile layout: greedy character wrapping and canvas sizing
//!
//! Nothing in here touches a drawing surface. Text is measured through a
//! plain `Fn(&str) -> f64` so the same code runs against a browser canvas
//! and the headless measurer.

pub mod sizing;
pub mod text;

pub use sizing::{canvas_size, resolve_dimensions, resolve_height, resolve_width, CanvasSize};
pub use text::{count_lines, wrap_lines, WrappedLines};

/// `sin(|angle|)` with the angle in degrees
pub(crate) fn abs_sin_deg(angle: f64) -> f64 {
    angle.abs().to_radians().sin()
}
