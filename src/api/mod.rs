//! Browser backend
//!
//! - `web`: `WebHost`, the `Host` implementation over web-sys (canvas, DOM,
//!   MutationObserver, window events, timers)
//! - `bindings`: the `Watermark` class exported to JavaScript
//! - `helpers`: option decoding and JS error conversion

pub mod bindings;
pub mod helpers;
pub mod web;

pub use bindings::JsWatermark;
pub use web::{CanvasRenderer, DispatchSlot, WebHost};
