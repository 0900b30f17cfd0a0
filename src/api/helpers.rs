//! Shared helpers for the JavaScript-facing API
//!
//! Decoding of options objects, element lookups on plain JS objects, and
//! conversion of JS exceptions into watermark errors.

use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

use crate::models::WatermarkError;

/// Deserialize a value from JavaScript, logging what went wrong
pub fn deserialize<T: DeserializeOwned>(value: JsValue, error_context: &str) -> Option<T> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| log::warn!("[Watermark] {}: {}", error_context, e))
        .ok()
}

/// First of `keys` on `object` that holds a DOM element
pub fn element_field(object: &JsValue, keys: &[&str]) -> Option<Element> {
    if !object.is_object() {
        return None;
    }
    keys.iter().find_map(|key| {
        js_sys::Reflect::get(object, &JsValue::from_str(key))
            .ok()
            .and_then(|value| value.dyn_into::<Element>().ok())
    })
}

/// `undefined` and `null` both mean "not given"
pub fn is_absent(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

pub fn js_error(value: JsValue) -> WatermarkError {
    let message = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value));
    WatermarkError::Host(message)
}
