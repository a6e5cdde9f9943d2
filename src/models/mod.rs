//! Models for the notation object graph
//!
//! This module contains the read-only input structures handed to the
//! exporter: scores, parts, measures, elements, and spanners.

pub mod core;
pub mod elements;
pub mod notation;
pub mod pitch;
pub mod barlines;
pub mod serde_helpers;

// Re-export commonly used types
pub use self::core::*;
pub use elements::*;
pub use notation::*;
pub use pitch::*;
pub use barlines::*;
