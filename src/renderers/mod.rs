//! Renderers module
//!
//! This module contains export logic for converting scores into
//! interchange formats.

pub mod musicxml;

// Re-export commonly used types
pub use musicxml::{to_musicxml, ExportError, ScoreExporter, XmlDocument};
