//! Text Watermark WASM Module
//!
//! Renders a rotated text tile onto a canvas, repeats it as the background of
//! an input-transparent overlay covering a region of the page, and re-renders
//! the overlay when the region resizes or someone removes or restyles it.
//!
//! The core (`layout`, `renderers`, `overlay`, `controller`) is written against
//! the `Host` trait. `api` implements it for the browser, `headless` in memory.

pub mod api;
pub mod controller;
pub mod headless;
pub mod host;
pub mod layout;
pub mod models;
pub mod overlay;
pub mod renderers;

// Re-export commonly used types
pub use controller::{ControllerState, MutationRecord, Reaction, Signal, Watermark};
pub use headless::HeadlessHost;
pub use host::Host;
pub use models::{
    Dimension, RegionRef, TileMode, WatermarkConfig, WatermarkError, WatermarkOptions,
};

use wasm_bindgen::prelude::*;

// Runs once when the WASM module is instantiated.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // a logger may already be installed by the embedding page
    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("Watermark WASM module initialized");
}
