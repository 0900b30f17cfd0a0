//! Host surface abstraction
//!
//! The watermark core never talks to a DOM directly. Everything it needs from
//! the surface it is mounted on goes through `Host`: region lookup and
//! geometry, removing and attaching the overlay, a drawing capability, and
//! subscriptions for the signals that drive re-rendering.

use crate::controller::Reaction;
use crate::models::{RegionRef, Result};
use crate::overlay::Overlay;
use crate::renderers::TextRenderer;

pub trait Host {
    /// Handle to a region (an element in the browser)
    type Region: Clone;
    type Renderer: TextRenderer;
    /// Stable handle returned by `subscribe` and consumed by `unsubscribe`
    type Subscription;

    /// Whether the surface can be manipulated yet
    fn is_ready(&self) -> bool;

    fn device_pixel_ratio(&self) -> f64;

    fn root_region(&self) -> Option<Self::Region>;

    fn query_region(&self, selector: &str) -> Option<Self::Region>;

    /// Whether a region handle still refers to a live element
    fn contains_region(&self, region: &Self::Region) -> bool;

    fn is_root(&self, region: &Self::Region) -> bool;

    /// Content-box size of a region, zero when unknown
    fn client_size(&self, region: &Self::Region) -> (f64, f64);

    fn viewport_size(&self) -> (f64, f64);

    /// Inline `position` style of a region, empty when unset
    fn position_style(&self, region: &Self::Region) -> String;

    fn set_position_style(&mut self, region: &Self::Region, value: &str) -> Result<()>;

    /// A fresh drawing surface, `None` when the environment has none
    fn create_renderer(&mut self) -> Option<Self::Renderer>;

    fn element_exists(&self, id: &str) -> bool;

    /// Detach the element with `id` from its parent
    fn detach_element(&mut self, id: &str) -> Result<()>;

    fn append_overlay(&mut self, region: &Self::Region, overlay: &Overlay) -> Result<()>;

    /// Start delivering signals for `reaction`, `None` when unsupported
    fn subscribe(&mut self, reaction: Reaction<Self::Region>) -> Option<Self::Subscription>;

    fn unsubscribe(&mut self, subscription: Self::Subscription);

    /// Deliver `Signal::Poll` after `delay_ms`
    fn schedule_poll(&mut self, delay_ms: f64);

    /// Resolve a region reference to a live region
    fn resolve(&self, region: &RegionRef<Self::Region>) -> Option<Self::Region> {
        match region {
            RegionRef::Root => self.root_region(),
            RegionRef::Selector(selector) => self.query_region(selector),
            RegionRef::Node(node) => self.contains_region(node).then(|| node.clone()),
        }
    }
}
