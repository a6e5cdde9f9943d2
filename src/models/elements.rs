//! Measure elements
//!
//! Every element of a measure is one `MeasureElement`: an identity, an
//! offset from the start of the measure, and a kind drawn from a closed set.

use serde::{Deserialize, Serialize};

use super::barlines::Barline;
use super::core::{ElementId, QuarterLength};
use super::notation::{Duration, NoteMarks, NoteType, Notehead, Placement, TieKind};
use super::pitch::{Pitch, Step};
use super::serde_helpers;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MeasureElement {
    pub id: ElementId,
    /// Quarter lengths from the start of the measure
    #[serde(with = "serde_helpers::quarter_length", default = "zero")]
    pub offset: QuarterLength,
    #[serde(flatten)]
    pub kind: ElementKind,
}

fn zero() -> QuarterLength {
    QuarterLength::from_integer(0)
}

impl MeasureElement {
    pub fn new(id: u32, offset: QuarterLength, kind: ElementKind) -> Self {
        Self { id: ElementId(id), offset, kind }
    }

    /// Sounding duration, zero for everything that does not advance time
    pub fn duration(&self) -> Option<&Duration> {
        match &self.kind {
            ElementKind::Note(note) => Some(&note.duration),
            ElementKind::Unpitched(note) => Some(&note.duration),
            ElementKind::Chord(chord) => Some(&chord.duration),
            ElementKind::Rest(rest) => Some(&rest.duration),
            _ => None,
        }
    }

    /// Whether the element is a grace note or grace chord
    pub fn is_grace(&self) -> bool {
        match &self.kind {
            ElementKind::Note(note) => note.marks.grace.is_some(),
            ElementKind::Unpitched(note) => note.marks.grace.is_some(),
            ElementKind::Chord(chord) => chord.marks.grace.is_some(),
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Note(Note),
    Unpitched(Unpitched),
    Chord(Chord),
    Rest(Rest),
    Clef(Clef),
    KeySignature(KeySignature),
    TimeSignature(TimeSignature),
    Dynamic(Dynamic),
    TextExpression(TextExpression),
    MetronomeMark(MetronomeMark),
    RehearsalMark(RehearsalMark),
    Segno,
    Coda,
    Harmony(Harmony),
    Barline(Barline),
    /// Engraving-only hint with no MusicXML counterpart
    LayoutHint,
}

impl ElementKind {
    /// Written as `<direction>` (or `<harmony>`), positioned by `<offset>` past the content end
    pub fn is_direction_like(&self) -> bool {
        matches!(
            self,
            ElementKind::Dynamic(_)
                | ElementKind::TextExpression(_)
                | ElementKind::MetronomeMark(_)
                | ElementKind::RehearsalMark(_)
                | ElementKind::Segno
                | ElementKind::Coda
                | ElementKind::Harmony(_)
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
    #[serde(default)]
    pub tie: Option<TieKind>,
    #[serde(default)]
    pub notehead: Option<Notehead>,
    #[serde(default)]
    pub marks: NoteMarks,
}

impl Note {
    pub fn new(pitch: Pitch, duration: Duration) -> Self {
        Self {
            pitch,
            duration,
            tie: None,
            notehead: None,
            marks: NoteMarks::default(),
        }
    }
}

/// Percussion note placed on the staff by display position
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Unpitched {
    pub display_step: Step,
    pub display_octave: i8,
    pub duration: Duration,
    #[serde(default)]
    pub tie: Option<TieKind>,
    #[serde(default)]
    pub notehead: Option<Notehead>,
    #[serde(default)]
    pub marks: NoteMarks,
}

/// One pitch of a chord, with the attributes each tone keeps for itself
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChordTone {
    pub pitch: Pitch,
    #[serde(default)]
    pub tie: Option<TieKind>,
    #[serde(default)]
    pub notehead: Option<Notehead>,
}

impl ChordTone {
    pub fn new(pitch: Pitch) -> Self {
        Self { pitch, tie: None, notehead: None }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chord {
    /// Lowest first
    pub tones: Vec<ChordTone>,
    pub duration: Duration,
    #[serde(default)]
    pub marks: NoteMarks,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Rest {
    pub duration: Duration,
    /// Written as a measure rest regardless of its length
    #[serde(default)]
    pub full_measure: bool,
    /// Vertical shift in staff steps from the middle line
    #[serde(default)]
    pub step_shift: Option<i32>,
    #[serde(default)]
    pub marks: NoteMarks,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            full_measure: false,
            step_shift: None,
            marks: NoteMarks::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClefSign {
    G,
    F,
    C,
    #[serde(rename = "percussion")]
    Percussion,
    #[serde(rename = "TAB")]
    Tab,
    #[serde(rename = "none")]
    None,
}

impl ClefSign {
    pub fn xml_name(&self) -> &'static str {
        match self {
            ClefSign::G => "G",
            ClefSign::F => "F",
            ClefSign::C => "C",
            ClefSign::Percussion => "percussion",
            ClefSign::Tab => "TAB",
            ClefSign::None => "none",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Clef {
    pub sign: ClefSign,
    #[serde(default)]
    pub line: Option<u8>,
    #[serde(default)]
    pub octave_change: i8,
}

impl Clef {
    pub fn treble() -> Self {
        Self { sign: ClefSign::G, line: Some(2), octave_change: 0 }
    }

    pub fn bass() -> Self {
        Self { sign: ClefSign::F, line: Some(4), octave_change: 0 }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Ionian,
    Locrian,
}

impl Mode {
    pub fn xml_name(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Aeolian => "aeolian",
            Mode::Ionian => "ionian",
            Mode::Locrian => "locrian",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeySignature {
    /// Position on the circle of fifths, -7..=7
    pub fifths: i8,
    #[serde(default)]
    pub mode: Option<Mode>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimeSymbol {
    Common,
    Cut,
    SingleNumber,
    Normal,
}

impl TimeSymbol {
    pub fn xml_name(&self) -> &'static str {
        match self {
            TimeSymbol::Common => "common",
            TimeSymbol::Cut => "cut",
            TimeSymbol::SingleNumber => "single-number",
            TimeSymbol::Normal => "normal",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
    #[serde(default)]
    pub symbol: Option<TimeSymbol>,
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type, symbol: None }
    }

    /// Length of a full bar in quarter notes
    pub fn bar_duration(&self) -> QuarterLength {
        if self.beat_type == 0 {
            return QuarterLength::from_integer(0);
        }
        QuarterLength::new(i64::from(self.beats) * 4, i64::from(self.beat_type))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Dynamic {
    /// `p`, `mf`, `sfz`, ... anything else becomes `<other-dynamics>`
    pub value: String,
    #[serde(default)]
    pub placement: Option<Placement>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TextExpression {
    pub text: String,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetronomeMark {
    pub beat_unit: NoteType,
    #[serde(default)]
    pub beat_unit_dots: u8,
    #[serde(default)]
    pub per_minute: Option<f64>,
    /// Tempo words such as "Allegro"
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub parentheses: bool,
    #[serde(default)]
    pub placement: Option<Placement>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RehearsalMark {
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HarmonyPitch {
    pub step: Step,
    #[serde(default)]
    pub alter: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Harmony {
    pub root: HarmonyPitch,
    /// MusicXML kind value such as `major`, `dominant`, `minor-seventh`
    pub kind: String,
    #[serde(default)]
    pub kind_text: Option<String>,
    #[serde(default)]
    pub bass: Option<HarmonyPitch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_duration() {
        assert_eq!(TimeSignature::new(9, 8).bar_duration(), QuarterLength::new(9, 2));
        assert_eq!(TimeSignature::new(4, 4).bar_duration(), QuarterLength::from_integer(4));
    }

    #[test]
    fn test_element_json_shape() {
        let json = r#"{
            "id": 7,
            "offset": "1/3",
            "type": "note",
            "pitch": {"step": "C", "octave": 4},
            "duration": {"quarter_length": "1/3"}
        }"#;
        let element: MeasureElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.offset, QuarterLength::new(1, 3));
        assert!(matches!(element.kind, ElementKind::Note(_)));
        assert_eq!(element.duration().map(|d| d.quarter_length), Some(QuarterLength::new(1, 3)));
    }
}
