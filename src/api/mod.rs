//! MusicXML export API
//!
//! JSON in, MusicXML out. The plain Rust functions are usable natively;
//! the `#[wasm_bindgen]` wrappers expose the same calls to JavaScript.
//!
//! # Module Structure
//!
//! - `export`: Score JSON to MusicXML conversion and its wasm wrapper

pub mod export;

pub use export::{export_score_json, export_score_json_js, ApiError};
