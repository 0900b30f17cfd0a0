//! Tile compositing
//!
//! Turns a rendered tile into the CSS background that fills the region.

use super::canvas::ResolvedTile;
use crate::models::TileMode;
use crate::overlay::StyleDeclaration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Both,
    Horizontal,
    Vertical,
}

impl Repeat {
    pub fn css(&self) -> &'static str {
        match self {
            Repeat::Both => "repeat",
            Repeat::Horizontal => "repeat-x",
            Repeat::Vertical => "repeat-y",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundLayer {
    pub image: String,
    /// Offset of the first tile in px
    pub position: (f64, f64),
    pub repeat: Repeat,
}

/// Layered, repeating background built from one tile image
#[derive(Clone, Debug, PartialEq)]
pub struct Background {
    pub layers: Vec<BackgroundLayer>,
    /// Size of one tile (text block plus spacing)
    pub size: (f64, f64),
}

impl Background {
    /// `background-*` declarations, image first and size last
    pub fn declarations(&self) -> Vec<StyleDeclaration> {
        vec![
            StyleDeclaration::new(
                "background-image",
                join_layers(&self.layers, |l| format!("url({})", l.image)),
            ),
            StyleDeclaration::new(
                "background-position",
                join_layers(&self.layers, |l| css_position(l.position)),
            ),
            StyleDeclaration::new(
                "background-repeat",
                join_layers(&self.layers, |l| l.repeat.css().to_string()),
            ),
            StyleDeclaration::new(
                "background-size",
                format!("{}px {}px", self.size.0, self.size.1),
            ),
        ]
    }
}

fn join_layers<F>(layers: &[BackgroundLayer], f: F) -> String
where
    F: Fn(&BackgroundLayer) -> String,
{
    layers.iter().map(f).collect::<Vec<_>>().join(", ")
}

fn css_position((x, y): (f64, f64)) -> String {
    if x == 0.0 && y == 0.0 {
        "0 0".to_string()
    } else {
        format!("{}px {}px", x, y)
    }
}

/// Build the background for `mode`.
///
/// Stagger layers a second copy offset by half a tile on both axes; its
/// spacing was already doubled when the tile was rendered.
pub fn compose(tile: &ResolvedTile, mode: TileMode) -> Background {
    let size = (tile.canvas.tile_width, tile.canvas.tile_height);
    let layer = |position, repeat| BackgroundLayer {
        image: tile.image.clone(),
        position,
        repeat,
    };

    let layers = match mode {
        TileMode::Normal => vec![layer((0.0, 0.0), Repeat::Both)],
        TileMode::Horizontal => vec![layer((0.0, 0.0), Repeat::Horizontal)],
        TileMode::Vertical => vec![layer((0.0, 0.0), Repeat::Vertical)],
        TileMode::Stagger => vec![
            layer((0.0, 0.0), Repeat::Both),
            layer((size.0 / 2.0, size.1 / 2.0), Repeat::Both),
        ],
    };

    Background { layers, size }
}
