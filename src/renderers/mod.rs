//! Tile rendering
//!
//! `TextRenderer` is the drawing capability the host hands out (a 2D canvas in
//! the browser, a recorder in headless mode). `canvas` turns text and config
//! into one rendered tile; `tile` turns that tile into a CSS background.

pub mod canvas;
pub mod tile;

pub use canvas::{draw_rotated_text, render_tile, start_offset, ResolvedTile};
pub use tile::{compose, Background, BackgroundLayer, Repeat};

use crate::models::{RenderParams, Result};

/// Font and fill applied before measuring or drawing
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// CSS font shorthand
    pub font: String,
    pub font_size: f64,
    pub color: String,
}

impl TextStyle {
    pub fn from_params(params: &RenderParams) -> Self {
        Self {
            font: params.font.css(),
            font_size: params.font.size,
            color: params.color.clone(),
        }
    }
}

/// A stateful 2D drawing surface that can measure text
///
/// Implementations draw left-aligned text with a bottom baseline. `resize`
/// clears the surface and resets its state, like assigning a canvas size does.
pub trait TextRenderer {
    fn set_style(&mut self, style: &TextStyle);

    /// Advance width of `text` in logical pixels
    fn measure_text(&self, text: &str) -> f64;

    fn resize(&mut self, pixel_width: u32, pixel_height: u32);

    fn save(&mut self);

    fn restore(&mut self);

    fn scale(&mut self, x: f64, y: f64) -> Result<()>;

    fn translate(&mut self, x: f64, y: f64) -> Result<()>;

    /// Rotate the current transform, clockwise in radians
    fn rotate(&mut self, radians: f64) -> Result<()>;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()>;

    /// Snapshot of the surface as a `data:` URI
    fn to_data_url(&self) -> Result<String>;
}
