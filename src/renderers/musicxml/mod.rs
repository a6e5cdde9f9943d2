//! MusicXML export module
//!
//! Provides MusicXML 3.1 partwise export for scores.
//!
//! # Module Structure
//!
//! - **converter**: Main entry point (`to_musicxml()`), score header and part-list
//! - **part**: Per-part export (instruments, divisions, measures)
//! - **measure**: Measure blocks, voice cursor, forward/backup bookkeeping
//! - **note**: Notes, chords, rests and their notations
//! - **direction**: Directions, harmony, and direction-type spanners
//! - **barline**: Barlines and endings
//! - **part_staff**: Joining multi-staff instruments into one part
//! - **spanners**: Spanner membership index and number allocation
//! - **builder**: Arena XML document and serialization
//! - **pitch**: Pitch, accidental, and clef position helpers
//! - **duration**: Divisions lattice and note type inference
//! - **helpers**: Utility functions (GCD/LCM, measure numbers, logging)
//! - **errors**: Export error types

pub mod barline;
pub mod builder;
pub mod converter;
pub mod direction;
pub mod duration;
pub mod errors;
pub mod helpers;
pub mod measure;
pub mod note;
pub mod part;
pub mod part_staff;
pub mod pitch;
pub mod spanners;

pub use builder::{NodeId, XmlDocument};
pub use converter::{to_musicxml, ScoreExporter, MUSICXML_DOCTYPE};
pub use duration::Divisions;
pub use errors::{ExportError, ExportErrorKind, ExportResult};
pub use helpers::log_musicxml;
pub use part_staff::{joinable_groups, JoinGroup};
