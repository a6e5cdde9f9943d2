//! Error types for MusicXML export
//!
//! Every failure is fatal. The kind says what went wrong; `ExportError`
//! adds where, filled in at the failure site as the error travels out
//! through the measure, part, and merge layers.

use std::fmt;
use thiserror::Error;

use crate::models::ElementId;

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportErrorKind {
    /// Duration or offset does not sit on the divisions lattice
    #[error("Unrepresentable duration {value}: {reason}")]
    UnrepresentableDuration { value: String, reason: String },

    /// Tuplet bracket boundary label outside start/stop/startStop
    #[error("Invalid tuplet boundary '{0}'")]
    InvalidTupletBoundary(String),

    /// Tuplet with a zero side, or nested ratios too large to write
    #[error("Invalid tuplet ratio {0}")]
    InvalidTupletRatio(String),

    /// Partial beam without direction, direction on a full beam, or unknown label
    #[error("Invalid beam: {0}")]
    InvalidBeam(String),

    /// Spanner refers to an element that is not in the part
    #[error("Spanner {spanner} refers to missing element {target}")]
    UnresolvedSpannerTarget { spanner: String, target: ElementId },

    /// Element already carried a `<staff>` before the merge tagged it
    #[error("<{0}> already carries a <staff> tag")]
    StaffTagCollision(String),

    #[error("{clefs} clefs for {staves} staves")]
    ClefCountExceeded { clefs: usize, staves: usize },

    /// Staff group names a part that was not exported
    #[error("No exported part for score part {0}")]
    MissingPartStaffMapping(usize),

    /// XML writer failure
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Export failure with the location it happened at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportError {
    pub kind: ExportErrorKind,
    pub part_name: Option<String>,
    /// Measure number as written, e.g. `"12a"`
    pub measure_number: Option<String>,
    /// 1-based staff within a joined group
    pub staff_index: Option<usize>,
}

impl ExportError {
    pub fn new(kind: ExportErrorKind) -> Self {
        Self {
            kind,
            part_name: None,
            measure_number: None,
            staff_index: None,
        }
    }

    /// Attach the part name unless an inner layer already did
    pub fn in_part(mut self, name: impl Into<String>) -> Self {
        if self.part_name.is_none() {
            self.part_name = Some(name.into());
        }
        self
    }

    pub fn at_measure(mut self, number: impl Into<String>) -> Self {
        if self.measure_number.is_none() {
            self.measure_number = Some(number.into());
        }
        self
    }

    pub fn on_staff(mut self, staff: usize) -> Self {
        if self.staff_index.is_none() {
            self.staff_index = Some(staff);
        }
        self
    }
}

impl From<ExportErrorKind> for ExportError {
    fn from(kind: ExportErrorKind) -> Self {
        ExportError::new(kind)
    }
}

impl From<quick_xml::Error> for ExportError {
    fn from(err: quick_xml::Error) -> Self {
        ExportError::new(ExportErrorKind::Serialization(err.to_string()))
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        let mut context = Vec::new();
        if let Some(part) = &self.part_name {
            context.push(format!("part '{}'", part));
        }
        if let Some(measure) = &self.measure_number {
            context.push(format!("measure {}", measure));
        }
        if let Some(staff) = self.staff_index {
            context.push(format!("staff {}", staff));
        }
        if !context.is_empty() {
            write!(f, " ({})", context.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_full_context() {
        let err = ExportError::new(ExportErrorKind::StaffTagCollision("note".to_string()))
            .in_part("Piano")
            .at_measure("3")
            .on_staff(2);
        assert_eq!(
            err.to_string(),
            "<note> already carries a <staff> tag (part 'Piano', measure 3, staff 2)"
        );
    }

    #[test]
    fn test_inner_context_wins() {
        let err = ExportError::new(ExportErrorKind::InvalidBeam("partial beam without direction".into()))
            .at_measure("4")
            .at_measure("9")
            .in_part("Flute");
        assert_eq!(err.measure_number.as_deref(), Some("4"));
        assert_eq!(
            err.to_string(),
            "Invalid beam: partial beam without direction (part 'Flute', measure 4)"
        );
    }

    #[test]
    fn test_display_without_context() {
        let err: ExportError = ExportErrorKind::InvalidTupletBoundary("middle".into()).into();
        assert_eq!(err.to_string(), "Invalid tuplet boundary 'middle'");
    }
}
