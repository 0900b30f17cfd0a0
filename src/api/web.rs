//! web-sys implementation of `Host`
//!
//! Every DOM callback (resize, DOMContentLoaded, MutationObserver) is turned
//! into a `Signal` and handed to the controller from a `setTimeout(0)` task,
//! never from inside the callback itself. That keeps the controller from being
//! re-entered and lets `unsubscribe` drop a listener's closure safely.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget,
    HtmlCanvasElement, HtmlElement, MutationObserver, MutationObserverInit, Node, Window,
};

use super::helpers::js_error;
use crate::controller::{MutationRecord, Reaction, Signal};
use crate::host::Host;
use crate::models::{Result, WatermarkError};
use crate::overlay::{Overlay, OverlayElement};
use crate::renderers::{TextRenderer, TextStyle};

// ============================================================================
// Signal dispatch
// ============================================================================

pub type Dispatcher = Rc<dyn Fn(Signal)>;

/// Late-bound route from host callbacks back to the controller
#[derive(Clone, Default)]
pub struct DispatchSlot(Rc<RefCell<Option<Dispatcher>>>);

impl DispatchSlot {
    pub fn install(&self, dispatcher: Dispatcher) {
        *self.0.borrow_mut() = Some(dispatcher);
    }

    pub fn clear(&self) {
        self.0.borrow_mut().take();
    }

    /// Deliver `signal` from a fresh task after `delay_ms`
    pub fn dispatch_later(&self, signal: Signal, delay_ms: i32) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let slot = self.clone();
        let callback = Closure::once_into_js(move || {
            let dispatcher = slot.0.borrow().clone();
            if let Some(dispatch) = dispatcher {
                dispatch(signal);
            }
        });
        if let Err(e) = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms)
        {
            log::warn!("[Watermark] failed to schedule callback: {}", js_error(e));
        }
    }
}

// ============================================================================
// Listeners
// ============================================================================

/// A registered reaction together with the exact closure it was registered
/// with, so removal always matches registration
enum Listener {
    Event {
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut()>,
    },
    Mutation {
        observer: MutationObserver,
        _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
    },
}

impl Listener {
    fn detach(self) {
        match self {
            Listener::Event {
                target,
                event,
                callback,
            } => {
                if let Err(e) =
                    target.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
                {
                    log::warn!("[Watermark] failed to remove {} listener: {}", event, js_error(e));
                }
            }
            Listener::Mutation { observer, .. } => observer.disconnect(),
        }
    }
}

fn class_of(node: &Node) -> String {
    node.dyn_ref::<Element>()
        .map(|e| e.class_name())
        .unwrap_or_default()
}

fn convert_record(record: &web_sys::MutationRecord) -> Option<MutationRecord> {
    match record.type_().as_str() {
        "attributes" => Some(MutationRecord::Attributes {
            name: record.attribute_name().unwrap_or_default(),
            target_class: record.target().map(|n| class_of(&n)).unwrap_or_default(),
            old_value: record.old_value(),
        }),
        "childList" => {
            let removed = record.removed_nodes();
            let removed_classes = (0..removed.length())
                .filter_map(|i| removed.get(i))
                .map(|n| class_of(&n))
                .collect();
            Some(MutationRecord::ChildList { removed_classes })
        }
        "characterData" => Some(MutationRecord::CharacterData),
        _ => None,
    }
}

fn convert_records(records: &js_sys::Array) -> Vec<MutationRecord> {
    records
        .iter()
        .filter_map(|value| value.dyn_into::<web_sys::MutationRecord>().ok())
        .filter_map(|record| convert_record(&record))
        .collect()
}

fn region_change_init() -> MutationObserverInit {
    let init = MutationObserverInit::new();
    init.set_attributes(true);
    init
}

fn tamper_guard_init() -> MutationObserverInit {
    let init = MutationObserverInit::new();
    init.set_attributes(true);
    init.set_subtree(true);
    init.set_child_list(true);
    init.set_character_data(true);
    init.set_attribute_old_value(true);
    init.set_character_data_old_value(true);

    let filter = js_sys::Array::of2(&JsValue::from_str("style"), &JsValue::from_str("class"));
    if let Err(e) = js_sys::Reflect::set(&init, &JsValue::from_str("attributeFilter"), &filter) {
        log::warn!("[Watermark] failed to set attribute filter: {}", js_error(e));
    }
    init
}

// ============================================================================
// Canvas renderer
// ============================================================================

/// 2D canvas drawing surface
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    /// `None` when the browser has no 2D canvas context
    pub fn create(document: &Document) -> Option<Self> {
        let canvas = document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        let context = canvas
            .get_context("2d")
            .ok()??
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self { canvas, context })
    }
}

impl TextRenderer for CanvasRenderer {
    fn set_style(&mut self, style: &TextStyle) {
        self.context.set_font(&style.font);
        self.context.set_fill_style_str(&style.color);
        self.context.set_text_align("left");
        self.context.set_text_baseline("bottom");
    }

    fn measure_text(&self, text: &str) -> f64 {
        match self.context.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(e) => {
                log::warn!("[Watermark] measureText failed: {}", js_error(e));
                0.0
            }
        }
    }

    fn resize(&mut self, pixel_width: u32, pixel_height: u32) {
        self.canvas.set_width(pixel_width);
        self.canvas.set_height(pixel_height);
    }

    fn save(&mut self) {
        self.context.save();
    }

    fn restore(&mut self) {
        self.context.restore();
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.context.scale(x, y).map_err(js_error)
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        self.context.translate(x, y).map_err(js_error)
    }

    fn rotate(&mut self, radians: f64) -> Result<()> {
        self.context.rotate(radians).map_err(js_error)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.context.fill_text(text, x, y).map_err(js_error)
    }

    fn to_data_url(&self) -> Result<String> {
        self.canvas.to_data_url_with_type("image/png").map_err(js_error)
    }
}

// ============================================================================
// Host
// ============================================================================

pub struct WebHost {
    window: Option<Window>,
    document: Option<Document>,
    slot: DispatchSlot,
    listeners: HashMap<u32, Listener>,
    next_id: u32,
}

impl WebHost {
    pub fn new() -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(|w| w.document());
        Self {
            window,
            document,
            slot: DispatchSlot::default(),
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Where signals end up; install the controller's dispatcher here
    pub fn dispatch_slot(&self) -> DispatchSlot {
        self.slot.clone()
    }

    fn register(&mut self, listener: Listener) -> u32 {
        self.next_id += 1;
        self.listeners.insert(self.next_id, listener);
        self.next_id
    }

    fn listen(&mut self, target: EventTarget, event: &'static str, signal: Signal) -> Option<u32> {
        let slot = self.slot.clone();
        let callback = Closure::<dyn FnMut()>::new(move || slot.dispatch_later(signal.clone(), 0));
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|e| log::warn!("[Watermark] failed to listen for {}: {}", event, js_error(e)))
            .ok()?;
        Some(self.register(Listener::Event {
            target,
            event,
            callback,
        }))
    }

    fn observe(
        &mut self,
        target: &Element,
        init: MutationObserverInit,
        to_signal: fn(Vec<MutationRecord>) -> Signal,
    ) -> Option<u32> {
        let slot = self.slot.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let records = convert_records(&records);
                if !records.is_empty() {
                    slot.dispatch_later(to_signal(records), 0);
                }
            },
        );
        // throws where MutationObserver is missing
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).ok()?;
        observer
            .observe_with_options(target, &init)
            .map_err(|e| log::warn!("[Watermark] observe failed: {}", js_error(e)))
            .ok()?;
        Some(self.register(Listener::Mutation {
            observer,
            _callback: callback,
        }))
    }

    fn body(&self) -> Option<Element> {
        self.document.as_ref()?.body().map(Element::from)
    }

    fn create_element(&self, spec: &OverlayElement) -> Result<Element> {
        let document = self
            .document
            .as_ref()
            .ok_or(WatermarkError::CapabilityUnavailable("document"))?;
        let element = document.create_element("div").map_err(js_error)?;
        element.set_class_name(spec.class_name);

        let html = element
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| WatermarkError::Host("created element is not an HTMLElement".to_string()))?;
        let style = html.style();
        for declaration in &spec.style {
            style
                .set_property(declaration.property, &declaration.value)
                .map_err(js_error)?;
        }
        Ok(element)
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        for (_, listener) in self.listeners.drain() {
            listener.detach();
        }
        self.slot.clear();
    }
}

impl Host for WebHost {
    type Region = Element;
    type Renderer = CanvasRenderer;
    type Subscription = u32;

    fn is_ready(&self) -> bool {
        self.document
            .as_ref()
            .map(|d| d.ready_state() != "loading")
            .unwrap_or(false)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window
            .as_ref()
            .map(|w| w.device_pixel_ratio())
            .filter(|ratio| *ratio > 0.0)
            .unwrap_or(1.0)
    }

    fn root_region(&self) -> Option<Element> {
        self.body()
    }

    fn query_region(&self, selector: &str) -> Option<Element> {
        self.document
            .as_ref()?
            .query_selector(selector)
            .map_err(|e| log::warn!("[Watermark] invalid selector {:?}: {}", selector, js_error(e)))
            .ok()
            .flatten()
    }

    fn contains_region(&self, region: &Element) -> bool {
        region.is_connected()
    }

    fn is_root(&self, region: &Element) -> bool {
        self.body().is_some_and(|body| body == *region)
    }

    fn client_size(&self, region: &Element) -> (f64, f64) {
        (region.client_width() as f64, region.client_height() as f64)
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.document
            .as_ref()
            .and_then(|d| d.document_element())
            .map(|root| (root.client_width() as f64, root.client_height() as f64))
            .unwrap_or((0.0, 0.0))
    }

    fn position_style(&self, region: &Element) -> String {
        region
            .dyn_ref::<HtmlElement>()
            .and_then(|e| e.style().get_property_value("position").ok())
            .unwrap_or_default()
    }

    fn set_position_style(&mut self, region: &Element, value: &str) -> Result<()> {
        let Some(element) = region.dyn_ref::<HtmlElement>() else {
            return Ok(());
        };
        element.style().set_property("position", value).map_err(js_error)
    }

    fn create_renderer(&mut self) -> Option<CanvasRenderer> {
        CanvasRenderer::create(self.document.as_ref()?)
    }

    fn element_exists(&self, id: &str) -> bool {
        self.document
            .as_ref()
            .and_then(|d| d.get_element_by_id(id))
            .is_some()
    }

    fn detach_element(&mut self, id: &str) -> Result<()> {
        let Some(element) = self.document.as_ref().and_then(|d| d.get_element_by_id(id)) else {
            return Ok(());
        };
        if let Some(parent) = element.parent_node() {
            parent.remove_child(&element).map_err(js_error)?;
        }
        Ok(())
    }

    fn append_overlay(&mut self, region: &Element, overlay: &Overlay) -> Result<()> {
        let container = self.create_element(&overlay.container)?;
        container.set_id(&overlay.id);
        let content = self.create_element(&overlay.content)?;

        container.append_child(&content).map_err(js_error)?;
        region.append_child(&container).map_err(js_error)?;
        Ok(())
    }

    fn subscribe(&mut self, reaction: Reaction<Element>) -> Option<u32> {
        match reaction {
            Reaction::Ready => {
                let target = EventTarget::from(self.document.clone()?);
                self.listen(target, "DOMContentLoaded", Signal::Ready)
            }
            Reaction::Resize => {
                let target = EventTarget::from(self.window.clone()?);
                self.listen(target, "resize", Signal::Resize)
            }
            Reaction::RegionChange(region) => {
                self.observe(&region, region_change_init(), Signal::RegionChanged)
            }
            Reaction::TamperGuard(region) => {
                self.observe(&region, tamper_guard_init(), Signal::Tampered)
            }
        }
    }

    fn unsubscribe(&mut self, subscription: u32) {
        if let Some(listener) = self.listeners.remove(&subscription) {
            listener.detach();
        }
    }

    fn schedule_poll(&mut self, delay_ms: f64) {
        self.slot.dispatch_later(Signal::Poll, delay_ms.ceil() as i32);
    }
}
