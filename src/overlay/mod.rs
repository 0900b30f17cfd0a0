//! Overlay mounting
//!
//! The overlay is two elements: an input-transparent, clipped container that
//! covers the region, and a content element carrying the tiled background.
//! Mounting is delete-before-create, so at most one overlay exists per id.

use crate::host::Host;
use crate::models::{RenderParams, Result, WatermarkError};
use crate::renderers::Background;

pub const CONTAINER_CLASS: &str = "watermark-container";
pub const CONTENT_CLASS: &str = "watermark-content";

/// One inline style property
#[derive(Clone, Debug, PartialEq)]
pub struct StyleDeclaration {
    pub property: &'static str,
    pub value: String,
}

impl StyleDeclaration {
    pub fn new(property: &'static str, value: impl Into<String>) -> Self {
        Self {
            property,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    pub class_name: &'static str,
    /// Applied in order
    pub style: Vec<StyleDeclaration>,
}

impl OverlayElement {
    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .rev()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }
}

/// Description of the overlay the host materializes
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    /// Id of the container element
    pub id: String,
    pub container: OverlayElement,
    /// Child of the container
    pub content: OverlayElement,
}

/// Describe the overlay for a region of `region_size` (content box).
///
/// The root surface gets `fixed` positioning so the watermark stays put while
/// it scrolls; any other region gets `absolute`.
pub fn build_overlay(
    id: &str,
    params: &RenderParams,
    region_size: (f64, f64),
    is_root: bool,
    background: &Background,
) -> Overlay {
    let (region_width, region_height) = region_size;
    let position = if is_root { "fixed" } else { "absolute" };

    let container = OverlayElement {
        class_name: CONTAINER_CLASS,
        style: vec![
            StyleDeclaration::new("pointer-events", "none"),
            StyleDeclaration::new("overflow", "hidden"),
            StyleDeclaration::new("top", "0"),
            StyleDeclaration::new("left", "0"),
            StyleDeclaration::new("margin", "0"),
            StyleDeclaration::new("padding", "0"),
            StyleDeclaration::new("position", position),
            StyleDeclaration::new("z-index", params.z_index.to_string()),
            StyleDeclaration::new("opacity", params.alpha.to_string()),
            StyleDeclaration::new("padding-top", format!("{}px", params.offset.top)),
            StyleDeclaration::new("padding-left", format!("{}px", params.offset.left)),
            StyleDeclaration::new("width", format!("{}px", region_width - params.offset.left)),
            StyleDeclaration::new("height", format!("{}px", region_height - params.offset.top)),
        ],
    };

    let mut content_style = vec![
        StyleDeclaration::new("width", "100%"),
        StyleDeclaration::new("height", "100%"),
        StyleDeclaration::new("margin", "0"),
        StyleDeclaration::new("padding", "0"),
    ];
    content_style.extend(background.declarations());

    Overlay {
        id: id.to_string(),
        container,
        content: OverlayElement {
            class_name: CONTENT_CLASS,
            style: content_style,
        },
    }
}

/// Remove the overlay with `id`. A missing element counts as removed.
pub fn remove_overlay<H: Host + ?Sized>(host: &mut H, id: &str) -> Result<()> {
    if !host.element_exists(id) {
        return Ok(());
    }
    host.detach_element(id).map_err(|e| WatermarkError::RemovalFailure {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// Mount a fresh overlay into `region`, replacing any overlay with the same id
pub fn mount_overlay<H: Host + ?Sized>(
    host: &mut H,
    region: &H::Region,
    id: &str,
    params: &RenderParams,
    background: &Background,
) -> Result<Overlay> {
    remove_overlay(host, id)?;

    let is_root = host.is_root(region);
    if !is_root {
        let position = host.position_style(region);
        if position.is_empty() || position == "static" {
            host.set_position_style(region, "relative")?;
        }
    }

    let region_size = effective_size(host, region);
    let overlay = build_overlay(id, params, region_size, is_root, background);
    host.append_overlay(region, &overlay)?;
    Ok(overlay)
}

// zero-sized regions fall back to the viewport, per axis
fn effective_size<H: Host + ?Sized>(host: &H, region: &H::Region) -> (f64, f64) {
    let (width, height) = host.client_size(region);
    let (viewport_width, viewport_height) = host.viewport_size();
    (
        if width > 0.0 { width } else { viewport_width },
        if height > 0.0 { height } else { viewport_height },
    )
}
