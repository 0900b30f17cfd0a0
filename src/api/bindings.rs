//! The `Watermark` class exported to JavaScript
//!
//! ```js
//! import { Watermark } from "watermark-wasm";
//!
//! const wm = new Watermark("CONFIDENTIAL", { angle: -20, mode: "stagger", prevent: true });
//! wm.reload(undefined, { alpha: 0.2 });
//! wm.remove();
//! ```
//!
//! None of these methods throw for watermark problems; failures are logged
//! as `[Watermark]` warnings and the call returns normally.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::Element;

use super::helpers::{deserialize, element_field, is_absent};
use super::web::WebHost;
use crate::controller::{Signal, Watermark};
use crate::models::{RegionRef, WatermarkConfig, WatermarkOptions};

/// Build a config from a JS options object.
///
/// Element references are read off the object directly since they cannot go
/// through serde; a selector takes precedence over an element.
pub fn config_from_js(options: &JsValue) -> WatermarkConfig<Element> {
    let parsed: WatermarkOptions = if is_absent(options) {
        WatermarkOptions::default()
    } else {
        deserialize(options.clone(), "Invalid watermark options").unwrap_or_default()
    };
    let mut config = WatermarkConfig::from_options(parsed);

    if matches!(config.target, RegionRef::Root) {
        if let Some(element) = element_field(options, &["targetRegion", "parentNode"]) {
            config.target = RegionRef::Node(element);
        }
    }
    if config.observe_target.is_none() {
        if let Some(element) = element_field(options, &["observeTarget", "observerNode"]) {
            config.observe_target = Some(RegionRef::Node(element));
        }
    }
    config
}

#[wasm_bindgen(js_name = Watermark)]
#[derive(Clone)]
pub struct JsWatermark {
    inner: Rc<RefCell<Watermark<WebHost>>>,
}

#[wasm_bindgen(js_class = Watermark)]
impl JsWatermark {
    /// `new Watermark()` is inert; `new Watermark(text, options)` also initializes
    #[wasm_bindgen(constructor)]
    pub fn new(text: Option<String>, options: JsValue) -> JsWatermark {
        let host = WebHost::new();
        let slot = host.dispatch_slot();
        let inner = Rc::new(RefCell::new(Watermark::new(host)));

        let weak = Rc::downgrade(&inner);
        slot.install(Rc::new(move |signal: Signal| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match inner.try_borrow_mut() {
                Ok(mut watermark) => watermark.handle(signal, js_sys::Date::now()),
                Err(_) => log::debug!("[Watermark] controller busy, signal dropped"),
            };
        }));

        let watermark = JsWatermark { inner };
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            watermark.init(text, options);
        }
        watermark
    }

    pub fn init(&self, text: String, options: JsValue) -> JsWatermark {
        let config = config_from_js(&options);
        self.inner.borrow_mut().init(&text, config);
        self.clone()
    }

    /// Without arguments the previous text and options are reused
    pub fn reload(&self, text: Option<String>, options: JsValue) -> JsWatermark {
        let config = (!is_absent(&options)).then(|| config_from_js(&options));
        self.inner.borrow_mut().reload(text.as_deref(), config);
        self.clone()
    }

    /// True when no watermark is left on the page
    pub fn remove(&self) -> bool {
        self.inner.borrow_mut().remove()
    }

    /// Data URI of the rendered tile
    #[wasm_bindgen(getter)]
    pub fn base64(&self) -> String {
        self.inner.borrow().base64().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn content(&self) -> String {
        self.inner.borrow().content().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> Option<String> {
        self.inner.borrow().id().map(str::to_string)
    }
}
