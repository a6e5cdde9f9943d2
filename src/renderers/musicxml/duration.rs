// Duration helpers for MusicXML export

use crate::models::{Duration, NoteType, QuarterLength};
use crate::models::serde_helpers::format_quarter_length;

use super::errors::ExportErrorKind;
use super::helpers::lcm;

/// Shortest length the lattice accepts: a 2048th note
pub fn minimum_quarter_length() -> QuarterLength {
    QuarterLength::new(1, 512)
}

/// Integer units per quarter note shared by a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisions(u64);

impl Default for Divisions {
    fn default() -> Self {
        Divisions(1)
    }
}

impl Divisions {
    pub fn new(per_quarter: u64) -> Self {
        Divisions(per_quarter.max(1))
    }

    pub fn per_quarter(&self) -> u64 {
        self.0
    }

    /// Smallest divisions that put every value on the lattice
    ///
    /// Zero and negative values carry no denominator information and are
    /// skipped here; `to_units` rejects the negative ones later.
    pub fn for_quarter_lengths<I>(values: I) -> Result<Self, ExportErrorKind>
    where
        I: IntoIterator<Item = QuarterLength>,
    {
        let mut divisions: u64 = 1;
        for value in values {
            if *value.numer() <= 0 {
                continue;
            }
            let denom = value.denom().unsigned_abs();
            divisions = lcm(divisions, denom)
                .filter(|d| *d <= i32::MAX as u64)
                .ok_or_else(|| ExportErrorKind::UnrepresentableDuration {
                    value: format_quarter_length(&value),
                    reason: "divisions would exceed the 32-bit range".to_string(),
                })?;
        }
        Ok(Divisions(divisions))
    }

    /// Common divisions for several parts that must share one lattice
    pub fn unify<I>(all: I) -> Result<Self, ExportErrorKind>
    where
        I: IntoIterator<Item = Divisions>,
    {
        let mut divisions: u64 = 1;
        for d in all {
            divisions = lcm(divisions, d.0)
                .filter(|d| *d <= i32::MAX as u64)
                .ok_or_else(|| ExportErrorKind::UnrepresentableDuration {
                    value: d.0.to_string(),
                    reason: "unified divisions would exceed the 32-bit range".to_string(),
                })?;
        }
        Ok(Divisions(divisions))
    }

    /// Convert a non-negative length to lattice units
    pub fn to_units(&self, quarter_length: QuarterLength) -> Result<u64, ExportErrorKind> {
        let unrepresentable = |reason: &str| ExportErrorKind::UnrepresentableDuration {
            value: format_quarter_length(&quarter_length),
            reason: reason.to_string(),
        };

        if quarter_length < QuarterLength::from_integer(0) {
            return Err(unrepresentable("negative length"));
        }
        if quarter_length == QuarterLength::from_integer(0) {
            return Ok(0);
        }
        if quarter_length < minimum_quarter_length() {
            return Err(unrepresentable("shorter than a 2048th note"));
        }

        let scaled = i128::from(*quarter_length.numer()) * i128::from(self.0);
        let denom = i128::from(*quarter_length.denom());
        if scaled % denom != 0 {
            return Err(unrepresentable(&format!(
                "not a multiple of 1/{} quarter",
                self.0
            )));
        }
        u64::try_from(scaled / denom).map_err(|_| unrepresentable("out of range"))
    }

    /// Exact inverse of `to_units`
    pub fn to_quarter_length(&self, units: u64) -> QuarterLength {
        QuarterLength::new(units as i64, self.0 as i64)
    }
}

/// Graphic type and dots for a duration
///
/// Uses the stored note type when present. Otherwise the length is scaled
/// back through the tuplet ratio and matched against the note values with up
/// to three dots.
pub fn resolve_note_type(duration: &Duration) -> Option<(NoteType, u8)> {
    if let Some(note_type) = duration.note_type {
        return Some((note_type, duration.dots));
    }
    let (actual, normal) = duration.tuplet_ratio()?;
    let written = duration.quarter_length * QuarterLength::new(i64::from(actual), i64::from(normal));
    infer_note_type(written)
}

/// Match a written (tuplet-free) length to a note type with dots
pub fn infer_note_type(written: QuarterLength) -> Option<(NoteType, u8)> {
    if written <= QuarterLength::from_integer(0) {
        return None;
    }
    for dots in 0u8..=3 {
        // dotted length = base * (2 - 1/2^dots)
        let factor = QuarterLength::from_integer(2) - QuarterLength::new(1, 1 << dots);
        let base = written / factor;
        if let Some(note_type) = NoteType::ALL.iter().find(|t| t.quarter_length() == base) {
            return Some((*note_type, dots));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tuplet;

    fn ql(n: i64, d: i64) -> QuarterLength {
        QuarterLength::new(n, d)
    }

    #[test]
    fn test_divisions_lcm_of_denominators() {
        let d = Divisions::for_quarter_lengths(vec![ql(1, 3), ql(1, 4), ql(3, 2), ql(0, 1)]).unwrap();
        assert_eq!(d.per_quarter(), 12);
    }

    #[test]
    fn test_divisions_integer_values() {
        let d = Divisions::for_quarter_lengths(vec![ql(4, 1), ql(2, 1)]).unwrap();
        assert_eq!(d.per_quarter(), 1);
    }

    #[test]
    fn test_to_units_round_trip() {
        let d = Divisions::new(12);
        assert_eq!(d.to_units(ql(1, 3)).unwrap(), 4);
        assert_eq!(d.to_quarter_length(4), ql(1, 3));
    }

    #[test]
    fn test_to_units_rejects_off_lattice() {
        let d = Divisions::new(4);
        assert!(matches!(
            d.to_units(ql(1, 3)),
            Err(ExportErrorKind::UnrepresentableDuration { .. })
        ));
    }

    #[test]
    fn test_to_units_rejects_below_floor() {
        let d = Divisions::new(1024);
        assert!(d.to_units(ql(1, 1024)).is_err());
        assert_eq!(d.to_units(ql(1, 512)).unwrap(), 2);
    }

    #[test]
    fn test_to_units_rejects_negative() {
        assert!(Divisions::new(1).to_units(ql(-1, 1)).is_err());
    }

    #[test]
    fn test_unify() {
        let d = Divisions::unify(vec![Divisions::new(4), Divisions::new(6)]).unwrap();
        assert_eq!(d.per_quarter(), 12);
    }

    #[test]
    fn test_infer_note_type() {
        assert_eq!(infer_note_type(ql(1, 1)), Some((NoteType::Quarter, 0)));
        assert_eq!(infer_note_type(ql(3, 4)), Some((NoteType::Eighth, 1)));
        assert_eq!(infer_note_type(ql(7, 2)), Some((NoteType::Half, 2)));
        assert_eq!(infer_note_type(ql(4, 1)), Some((NoteType::Whole, 0)));
        assert_eq!(infer_note_type(ql(5, 4)), None);
    }

    #[test]
    fn test_resolve_note_type_through_tuplet() {
        let mut triplet_eighth = Duration::quarters(1, 3);
        triplet_eighth.tuplets.push(Tuplet::new(3, 2));
        assert_eq!(resolve_note_type(&triplet_eighth), Some((NoteType::Eighth, 0)));
    }
}
