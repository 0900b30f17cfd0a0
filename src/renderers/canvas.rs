//! Rendering one watermark tile

use super::{TextRenderer, TextStyle};
use crate::layout::{abs_sin_deg, canvas_size, resolve_dimensions, wrap_lines, CanvasSize, WrappedLines};
use crate::models::{RenderParams, Result, Spacing};

/// Output of one render: geometry plus the rendered image
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTile {
    /// Resolved text block width (without spacing)
    pub width: f64,
    /// Resolved text block height (without spacing)
    pub height: f64,
    /// Spacing actually used; doubled in stagger mode
    pub spacing: Spacing,
    pub line_height: f64,
    pub line_count: usize,
    pub canvas: CanvasSize,
    /// `data:` URI of the tile
    pub image: String,
}

/// Vertical start of the first line.
///
/// Negative angles lift the left edge of the block, so they start lower by
/// `width * sin(|angle|)`. The extra four fifths of a line put the bottom
/// baseline near the visual bottom of the first line.
pub fn start_offset(width: f64, line_height: f64, angle: f64) -> f64 {
    let lowered = if angle < 0.0 { 1.0 } else { 0.0 };
    lowered * width * abs_sin_deg(angle) + line_height * (4.0 / 5.0)
}

/// Draw wrapped lines rotated by `angle` degrees around `(0, origin_y)`.
///
/// Every line moves down one `line_height` along the rotated axis and is
/// shifted sideways by `line_height * sin(angle) * index`, with the index
/// starting at -1 for negative angles so the block stays inside the canvas.
pub fn draw_rotated_text<T: TextRenderer + ?Sized>(
    renderer: &mut T,
    lines: &WrappedLines,
    origin_y: f64,
    line_height: f64,
    angle: f64,
) -> Result<()> {
    renderer.save();
    let drawn = draw_lines(renderer, lines, origin_y, line_height, angle);
    renderer.restore();
    drawn
}

fn draw_lines<T: TextRenderer + ?Sized>(
    renderer: &mut T,
    lines: &WrappedLines,
    origin_y: f64,
    line_height: f64,
    angle: f64,
) -> Result<()> {
    let radians = angle.to_radians();
    renderer.translate(0.0, origin_y)?;
    renderer.rotate(radians)?;

    let indent = line_height * radians.sin();
    let mut line_index: f64 = if angle < 0.0 { -1.0 } else { 0.0 };

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            renderer.translate(0.0, line_height)?;
            line_index += 1.0;
        }
        renderer.fill_text(line, indent * line_index, 0.0)?;
    }
    Ok(())
}

/// Size, draw and export one tile.
///
/// The renderer is measured with the scaled font first, then resized to the
/// tile's canvas (which resets its state), scaled by the device pixel ratio so
/// drawing stays in logical units, and drawn.
pub fn render_tile<T: TextRenderer + ?Sized>(
    renderer: &mut T,
    text: &str,
    params: &RenderParams,
    device_pixel_ratio: f64,
) -> Result<ResolvedTile> {
    let style = TextStyle::from_params(params);
    let line_height = params.font.line_height();
    let spacing = params.effective_spacing();

    renderer.set_style(&style);
    let (width, height) = resolve_dimensions(
        &params.width,
        &params.height,
        text,
        line_height,
        params.angle,
        |s| renderer.measure_text(s),
    )?;

    let canvas = canvas_size(width, height, spacing, device_pixel_ratio);
    renderer.resize(canvas.pixel_width, canvas.pixel_height);
    renderer.scale(canvas.device_pixel_ratio, canvas.device_pixel_ratio)?;
    renderer.set_style(&style);

    let lines = wrap_lines(text, width, |s| renderer.measure_text(s));
    let origin_y = start_offset(width, line_height, params.angle);
    draw_rotated_text(renderer, &lines, origin_y, line_height, params.angle)?;

    let image = renderer.to_data_url()?;
    log::debug!(
        "[Watermark] rendered tile {}x{} ({} lines, canvas {}x{})",
        width,
        height,
        lines.line_count(),
        canvas.pixel_width,
        canvas.pixel_height
    );

    Ok(ResolvedTile {
        width,
        height,
        spacing,
        line_height,
        line_count: lines.line_count(),
        canvas,
        image,
    })
}
