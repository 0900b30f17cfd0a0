//! In-memory host
//!
//! A `Host` without a DOM: regions are plain records, overlays are stored as
//! their descriptions, and text is measured deterministically as
//! `chars × font size × factor`. Drawing calls are recorded instead of
//! rasterized. Handy for tests and for previewing tile geometry on the server
//! side of a build.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::controller::{MutationRecord, Reaction};
use crate::host::Host;
use crate::models::{Result, WatermarkError};
use crate::overlay::{Overlay, StyleDeclaration, CONTAINER_CLASS};
use crate::renderers::{TextRenderer, TextStyle};

// ============================================================================
// Renderer
// ============================================================================

/// One recorded drawing call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    SetStyle { font: String, color: String },
    Resize { width: u32, height: u32 },
    Save,
    Restore,
    Scale { x: f64, y: f64 },
    Translate { x: f64, y: f64 },
    Rotate { radians: f64 },
    FillText { text: String, x: f64, y: f64 },
}

/// Recording renderer with a deterministic measurer
#[derive(Debug)]
pub struct HeadlessRenderer {
    char_width_factor: f64,
    font_size: f64,
    pixel_size: (u32, u32),
    ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl HeadlessRenderer {
    pub fn new(char_width_factor: f64) -> Self {
        Self::recording_into(char_width_factor, Rc::new(RefCell::new(Vec::new())))
    }

    fn recording_into(char_width_factor: f64, ops: Rc<RefCell<Vec<DrawOp>>>) -> Self {
        Self {
            char_width_factor,
            font_size: 16.0,
            pixel_size: (0, 0),
            ops,
        }
    }

    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }

    fn record(&self, op: DrawOp) {
        self.ops.borrow_mut().push(op);
    }
}

impl TextRenderer for HeadlessRenderer {
    fn set_style(&mut self, style: &TextStyle) {
        self.font_size = style.font_size;
        self.record(DrawOp::SetStyle {
            font: style.font.clone(),
            color: style.color.clone(),
        });
    }

    fn measure_text(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.font_size * self.char_width_factor
    }

    fn resize(&mut self, pixel_width: u32, pixel_height: u32) {
        self.pixel_size = (pixel_width, pixel_height);
        self.record(DrawOp::Resize {
            width: pixel_width,
            height: pixel_height,
        });
    }

    fn save(&mut self) {
        self.record(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.record(DrawOp::Restore);
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(DrawOp::Scale { x, y });
        Ok(())
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(DrawOp::Translate { x, y });
        Ok(())
    }

    fn rotate(&mut self, radians: f64) -> Result<()> {
        self.record(DrawOp::Rotate { radians });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.record(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
        });
        Ok(())
    }

    fn to_data_url(&self) -> Result<String> {
        let texts: Vec<String> = self
            .ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        Ok(format!(
            "data:image/x-headless;{}x{},{}",
            self.pixel_size.0,
            self.pixel_size.1,
            texts.join("|")
        ))
    }
}

// ============================================================================
// Host
// ============================================================================

#[derive(Clone, Debug)]
struct HeadlessRegion {
    selector: String,
    client_size: (f64, f64),
    position: String,
    attached: bool,
    overlays: Vec<Overlay>,
}

/// Live subscriptions, shared so tests can inspect them after the host moved
#[derive(Debug, Default)]
pub struct SubscriptionLog {
    next_id: u32,
    active: BTreeMap<u32, Reaction<usize>>,
    total: usize,
}

impl SubscriptionLog {
    pub fn active(&self) -> usize {
        self.active.len()
    }

    /// Subscriptions ever handed out
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn reactions(&self) -> Vec<Reaction<usize>> {
        self.active.values().cloned().collect()
    }
}

pub struct HeadlessHost {
    ready: bool,
    device_pixel_ratio: f64,
    viewport: (f64, f64),
    canvas_available: bool,
    observers_available: bool,
    detach_fails: bool,
    char_width_factor: f64,
    regions: Vec<HeadlessRegion>,
    subscriptions: Rc<RefCell<SubscriptionLog>>,
    scheduled_polls: Vec<f64>,
    renderers_created: usize,
    last_ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl HeadlessHost {
    /// A ready 1280×720 surface at device pixel ratio 1, with canvas and
    /// observer support. Region 0 is the root.
    pub fn new() -> Self {
        Self {
            ready: true,
            device_pixel_ratio: 1.0,
            viewport: (1280.0, 720.0),
            canvas_available: true,
            observers_available: true,
            detach_fails: false,
            char_width_factor: 1.0,
            regions: vec![HeadlessRegion {
                selector: "body".to_string(),
                client_size: (1280.0, 720.0),
                position: String::new(),
                attached: true,
                overlays: Vec::new(),
            }],
            subscriptions: Rc::new(RefCell::new(SubscriptionLog::default())),
            scheduled_polls: Vec::new(),
            renderers_created: 0,
            last_ops: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn add_region(&mut self, selector: &str, client_size: (f64, f64)) -> usize {
        self.regions.push(HeadlessRegion {
            selector: selector.to_string(),
            client_size,
            position: String::new(),
            attached: true,
            overlays: Vec::new(),
        });
        self.regions.len() - 1
    }

    pub fn detach_region(&mut self, region: usize) {
        if let Some(r) = self.regions.get_mut(region) {
            r.attached = false;
        }
    }

    pub fn set_client_size(&mut self, region: usize, size: (f64, f64)) {
        if let Some(r) = self.regions.get_mut(region) {
            r.client_size = size;
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_viewport(&mut self, viewport: (f64, f64)) {
        self.viewport = viewport;
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = ratio;
    }

    pub fn set_canvas_available(&mut self, available: bool) {
        self.canvas_available = available;
    }

    pub fn set_observers_available(&mut self, available: bool) {
        self.observers_available = available;
    }

    pub fn set_detach_fails(&mut self, fails: bool) {
        self.detach_fails = fails;
    }

    pub fn set_char_width_factor(&mut self, factor: f64) {
        self.char_width_factor = factor;
    }

    pub fn overlays_in(&self, region: usize) -> &[Overlay] {
        self.regions
            .get(region)
            .map(|r| r.overlays.as_slice())
            .unwrap_or(&[])
    }

    pub fn overlay(&self, id: &str) -> Option<&Overlay> {
        self.regions
            .iter()
            .flat_map(|r| r.overlays.iter())
            .find(|o| o.id == id)
    }

    /// Number of mounted overlays across all regions
    pub fn overlay_count(&self) -> usize {
        self.regions.iter().map(|r| r.overlays.len()).sum()
    }

    pub fn subscription_log(&self) -> Rc<RefCell<SubscriptionLog>> {
        Rc::clone(&self.subscriptions)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().active()
    }

    pub fn active_reactions(&self) -> Vec<Reaction<usize>> {
        self.subscriptions.borrow().reactions()
    }

    /// Delays passed to `schedule_poll`, oldest first
    pub fn scheduled_polls(&self) -> &[f64] {
        &self.scheduled_polls
    }

    pub fn renderers_created(&self) -> usize {
        self.renderers_created
    }

    /// Drawing calls of the most recently created renderer
    pub fn last_ops(&self) -> Vec<DrawOp> {
        self.last_ops.borrow().clone()
    }

    /// Simulate a script deleting the overlay; returns what an observer sees
    pub fn tamper_remove(&mut self, id: &str) -> Option<MutationRecord> {
        let removed = self.take_overlay(id)?;
        Some(MutationRecord::ChildList {
            removed_classes: vec![removed.container.class_name.to_string()],
        })
    }

    /// Simulate a script restyling the overlay container
    pub fn tamper_style(&mut self, id: &str, property: &'static str, value: &str) -> Option<MutationRecord> {
        let overlay = self
            .regions
            .iter_mut()
            .flat_map(|r| r.overlays.iter_mut())
            .find(|o| o.id == id)?;
        overlay.container.style.push(StyleDeclaration::new(property, value));
        Some(MutationRecord::Attributes {
            name: "style".to_string(),
            target_class: CONTAINER_CLASS.to_string(),
            old_value: None,
        })
    }

    fn take_overlay(&mut self, id: &str) -> Option<Overlay> {
        self.regions.iter_mut().find_map(|r| {
            let index = r.overlays.iter().position(|o| o.id == id)?;
            Some(r.overlays.remove(index))
        })
    }

    fn region(&self, region: &usize) -> Option<&HeadlessRegion> {
        self.regions.get(*region).filter(|r| r.attached)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for HeadlessHost {
    type Region = usize;
    type Renderer = HeadlessRenderer;
    type Subscription = u32;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn root_region(&self) -> Option<usize> {
        Some(0)
    }

    fn query_region(&self, selector: &str) -> Option<usize> {
        self.regions
            .iter()
            .position(|r| r.attached && r.selector == selector)
    }

    fn contains_region(&self, region: &usize) -> bool {
        self.region(region).is_some()
    }

    fn is_root(&self, region: &usize) -> bool {
        *region == 0
    }

    fn client_size(&self, region: &usize) -> (f64, f64) {
        self.region(region).map(|r| r.client_size).unwrap_or((0.0, 0.0))
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }

    fn position_style(&self, region: &usize) -> String {
        self.region(region).map(|r| r.position.clone()).unwrap_or_default()
    }

    fn set_position_style(&mut self, region: &usize, value: &str) -> Result<()> {
        let r = self
            .regions
            .get_mut(*region)
            .ok_or_else(|| WatermarkError::Host(format!("no region {}", region)))?;
        r.position = value.to_string();
        Ok(())
    }

    fn create_renderer(&mut self) -> Option<HeadlessRenderer> {
        if !self.canvas_available {
            return None;
        }
        self.renderers_created += 1;
        self.last_ops = Rc::new(RefCell::new(Vec::new()));
        Some(HeadlessRenderer::recording_into(
            self.char_width_factor,
            Rc::clone(&self.last_ops),
        ))
    }

    fn element_exists(&self, id: &str) -> bool {
        self.overlay(id).is_some()
    }

    fn detach_element(&mut self, id: &str) -> Result<()> {
        if self.detach_fails {
            return Err(WatermarkError::Host("node is not a child of its parent".to_string()));
        }
        self.take_overlay(id);
        Ok(())
    }

    fn append_overlay(&mut self, region: &usize, overlay: &Overlay) -> Result<()> {
        let r = self
            .regions
            .get_mut(*region)
            .filter(|r| r.attached)
            .ok_or_else(|| WatermarkError::Host(format!("no region {}", region)))?;
        r.overlays.push(overlay.clone());
        Ok(())
    }

    fn subscribe(&mut self, reaction: Reaction<usize>) -> Option<u32> {
        let needs_observer = matches!(
            reaction,
            Reaction::RegionChange(_) | Reaction::TamperGuard(_)
        );
        if needs_observer && !self.observers_available {
            return None;
        }
        let mut log = self.subscriptions.borrow_mut();
        log.next_id += 1;
        log.total += 1;
        let id = log.next_id;
        log.active.insert(id, reaction);
        Some(id)
    }

    fn unsubscribe(&mut self, subscription: u32) {
        self.subscriptions.borrow_mut().active.remove(&subscription);
    }

    fn schedule_poll(&mut self, delay_ms: f64) {
        self.scheduled_polls.push(delay_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_scales_with_font_size() {
        let mut renderer = HeadlessRenderer::new(0.5);
        renderer.set_style(&TextStyle {
            font: "normal 20px sans-serif".into(),
            font_size: 20.0,
            color: "black".into(),
        });
        assert_eq!(renderer.measure_text("abcd"), 40.0);
        assert_eq!(renderer.measure_text("机密"), 20.0);
    }

    #[test]
    fn test_host_renderers_use_configured_char_width() {
        let mut host = HeadlessHost::new();
        host.set_char_width_factor(0.5);
        let mut renderer = host.create_renderer().unwrap();
        renderer.set_style(&TextStyle {
            font: "normal 20px sans-serif".into(),
            font_size: 20.0,
            color: "black".into(),
        });
        assert_eq!(renderer.measure_text("abcd"), 40.0);
        assert_eq!(host.renderers_created(), 1);
    }

    #[test]
    fn test_query_skips_detached_regions() {
        let mut host = HeadlessHost::new();
        let region = host.add_region("#panel", (10.0, 10.0));
        assert_eq!(host.query_region("#panel"), Some(region));
        host.detach_region(region);
        assert_eq!(host.query_region("#panel"), None);
        assert!(!host.contains_region(&region));
    }

    #[test]
    fn test_observers_can_be_unavailable() {
        let mut host = HeadlessHost::new();
        host.set_observers_available(false);
        assert!(host.subscribe(Reaction::TamperGuard(0)).is_none());
        assert!(host.subscribe(Reaction::Resize).is_some());
    }
}
