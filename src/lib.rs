//! MusicXML Export WASM Module
//!
//! Converts a notation object graph (`models::Score`) into a MusicXML 3.1
//! partwise document, joining multi-staff instruments into single parts.

pub mod api;
pub mod config;
pub mod models;
pub mod renderers;

// Re-export commonly used types
pub use config::ExportConfig;
pub use models::core::*;
pub use models::elements::*;
pub use models::notation::*;
pub use renderers::musicxml::{to_musicxml, ExportError, ExportErrorKind, ScoreExporter};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // Fails only when the host already installed a logger
    #[cfg(feature = "console_log")]
    let _ = console_log::init_with_level(log::Level::Debug);

    log::info!("MusicXML export WASM module initialized");
}
