//! Pitch spelling
//!
//! Pitches are stored spelled (step + alter + octave), the way they are
//! written, together with the accidental the normalization passes decided
//! to display.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }

    /// Position within the octave, C = 0
    pub fn index(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    pub fn from_index(index: i32) -> Step {
        Step::ALL[index.rem_euclid(7) as usize]
    }
}

/// A written pitch
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Pitch {
    pub step: Step,
    /// Semitones, fractional for microtones
    #[serde(default)]
    pub alter: f64,
    pub octave: i8,
    #[serde(default)]
    pub accidental: Option<Accidental>,
}

impl Pitch {
    pub fn new(step: Step, alter: f64, octave: i8) -> Self {
        Self { step, alter, octave, accidental: None }
    }

    /// Diatonic step count from C0
    pub fn diatonic_number(&self) -> i32 {
        i32::from(self.octave) * 7 + self.step.index()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AccidentalKind {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
    SharpSharp,
    FlatFlat,
    TripleSharp,
    TripleFlat,
    NaturalSharp,
    NaturalFlat,
    QuarterSharp,
    QuarterFlat,
    ThreeQuartersSharp,
    ThreeQuartersFlat,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccidentalDisplay {
    Shown,
    Hidden,
    /// Display status was never decided upstream
    #[default]
    Unresolved,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Accidental {
    pub kind: AccidentalKind,
    #[serde(default)]
    pub display: AccidentalDisplay,
    #[serde(default)]
    pub parentheses: bool,
    #[serde(default)]
    pub cautionary: bool,
    #[serde(default)]
    pub editorial: bool,
}

impl Accidental {
    pub fn new(kind: AccidentalKind) -> Self {
        Self {
            kind,
            display: AccidentalDisplay::Shown,
            parentheses: false,
            cautionary: false,
            editorial: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diatonic_number() {
        assert_eq!(Pitch::new(Step::C, 0.0, 4).diatonic_number(), 28);
        assert_eq!(Pitch::new(Step::B, 0.0, 4).diatonic_number(), 34);
    }

    #[test]
    fn test_step_from_index_wraps() {
        assert_eq!(Step::from_index(34), Step::B);
        assert_eq!(Step::from_index(-1), Step::B);
    }
}
