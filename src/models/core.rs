//! Core score structures
//!
//! A `Score` owns its parts and staff groups; a `Part` owns its measures and
//! the spanners that connect elements across them. Every element carries a
//! stable `ElementId` assigned when the graph is built, so spanners can refer
//! to their members without holding references into the tree.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::barlines::Barline;
use super::elements::MeasureElement;
use super::notation::{LineType, Placement};

/// Length measured in quarter notes, kept exact
pub type QuarterLength = Rational64;

/// Stable integer identity of an element, measure, or spanner
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Score-wide descriptive data
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ScoreMetadata {
    pub work_title: Option<String>,
    pub work_number: Option<String>,
    pub movement_title: Option<String>,
    pub movement_number: Option<String>,
    pub composer: Option<String>,
    pub lyricist: Option<String>,
    pub arranger: Option<String>,
    pub rights: Option<String>,
}

/// Root of the object graph handed to the exporter
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Score {
    #[serde(default)]
    pub metadata: ScoreMetadata,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub staff_groups: Vec<StaffGroup>,
}

impl Score {
    /// True when there is nothing to export
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|part| part.measures.is_empty())
    }
}

/// One staff of music (a piano has two parts flagged `part_staff`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Part {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub spanners: Vec<Spanner>,
    /// Belongs to a multi-staff instrument and may be joined with its siblings
    #[serde(default)]
    pub part_staff: bool,
    /// Notes are stored at sounding pitch, so no `<transpose>` is written
    #[serde(default)]
    pub at_sounding_pitch: bool,
    /// Staff line count when it differs from five
    #[serde(default)]
    pub staff_lines: Option<u8>,
}

impl Part {
    /// Name used in diagnostics
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unnamed")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Instrument {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    /// General MIDI program, 1-based
    pub midi_program: Option<u8>,
    /// MIDI channel, 1-based
    pub midi_channel: Option<u8>,
    pub percussion: bool,
    pub transposition: Option<Transposition>,
}

impl Instrument {
    /// Whether the instrument asks for explicit MIDI settings
    pub fn has_midi_settings(&self) -> bool {
        self.midi_program.is_some() || self.midi_channel.is_some()
    }
}

/// Written-to-sounding interval
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transposition {
    pub diatonic: i32,
    pub chromatic: i32,
}

impl Transposition {
    pub fn is_identity(&self) -> bool {
        self.diatonic == 0 && self.chromatic == 0
    }

    /// Split whole octaves out of the interval: `(diatonic, chromatic, octave_change)`
    pub fn normalized(&self) -> (i32, i32, i32) {
        let octave_change = self.chromatic / 12;
        (
            self.diatonic - 7 * octave_change,
            self.chromatic - 12 * octave_change,
            octave_change,
        )
    }
}

/// Bracket or brace joining several parts in the part list
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StaffGroup {
    /// Indices into `Score::parts`
    pub parts: Vec<usize>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub symbol: Option<GroupSymbol>,
    #[serde(default = "default_true")]
    pub barline: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupSymbol {
    Brace,
    Bracket,
    Line,
    Square,
    None,
}

impl GroupSymbol {
    pub fn xml_name(&self) -> &'static str {
        match self {
            GroupSymbol::Brace => "brace",
            GroupSymbol::Bracket => "bracket",
            GroupSymbol::Line => "line",
            GroupSymbol::Square => "square",
            GroupSymbol::None => "none",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Measure {
    pub id: ElementId,
    pub number: u32,
    #[serde(default)]
    pub suffix: Option<String>,
    /// Pickup or otherwise uncounted measure
    #[serde(default)]
    pub implicit: bool,
    #[serde(default)]
    pub new_system: bool,
    #[serde(default)]
    pub new_page: bool,
    #[serde(default)]
    pub left_barline: Option<Barline>,
    #[serde(default)]
    pub right_barline: Option<Barline>,
    /// Measure-level block: clefs, signatures, directions, and notes outside any voice
    #[serde(default)]
    pub elements: Vec<MeasureElement>,
    #[serde(default)]
    pub voices: Vec<Voice>,
}

impl Measure {
    pub fn new(id: u32, number: u32) -> Self {
        Self {
            id: ElementId(id),
            number,
            suffix: None,
            implicit: false,
            new_system: false,
            new_page: false,
            left_barline: None,
            right_barline: None,
            elements: Vec::new(),
            voices: Vec::new(),
        }
    }

    /// Number as written in the `number` attribute, e.g. `"12a"`
    pub fn number_label(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}{}", self.number, suffix),
            None => self.number.to_string(),
        }
    }

    /// All elements of the measure, measure-level block first
    pub fn all_elements(&self) -> impl Iterator<Item = &MeasureElement> {
        self.elements
            .iter()
            .chain(self.voices.iter().flat_map(|voice| voice.elements.iter()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Voice {
    pub id: u32,
    #[serde(default)]
    pub elements: Vec<MeasureElement>,
}

/// Connects elements that may live in different measures
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Spanner {
    #[serde(flatten)]
    pub kind: SpannerKind,
    /// Notes or chords in time order; measure ids for repeat brackets
    pub members: Vec<ElementId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpannerKind {
    Slur {
        #[serde(default)]
        placement: Option<Placement>,
    },
    Glissando {
        #[serde(default)]
        line_type: Option<LineType>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Two-note tremolo
    Tremolo {
        #[serde(default = "default_tremolo_marks")]
        marks: u8,
    },
    TrillExtension,
    Ottava {
        /// 8 or 15 for up, -8 or -15 for down
        shift: i8,
    },
    Wedge {
        crescendo: bool,
        #[serde(default)]
        placement: Option<Placement>,
    },
    Line {
        #[serde(default)]
        line_type: Option<LineType>,
        #[serde(default)]
        start_hook: bool,
        #[serde(default)]
        end_hook: bool,
    },
    RepeatBracket {
        number: String,
        #[serde(default)]
        open_end: bool,
    },
}

fn default_tremolo_marks() -> u8 {
    3
}

impl SpannerKind {
    /// Spanners of the same family share a pool of `number` attributes
    pub fn family(&self) -> &'static str {
        match self {
            SpannerKind::Slur { .. } => "slur",
            SpannerKind::Glissando { .. } => "glissando",
            SpannerKind::Tremolo { .. } => "tremolo",
            SpannerKind::TrillExtension => "wavy-line",
            SpannerKind::Ottava { .. } => "octave-shift",
            SpannerKind::Wedge { .. } => "wedge",
            SpannerKind::Line { .. } => "bracket",
            SpannerKind::RepeatBracket { .. } => "ending",
        }
    }

    /// Written as a `<direction>` around its members rather than in `<notations>`
    pub fn is_direction(&self) -> bool {
        matches!(
            self,
            SpannerKind::Ottava { .. } | SpannerKind::Wedge { .. } | SpannerKind::Line { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transposition_normalized() {
        let tenor_sax = Transposition { diatonic: -8, chromatic: -14 };
        assert_eq!(tenor_sax.normalized(), (-1, -2, -1));

        let clarinet = Transposition { diatonic: -1, chromatic: -2 };
        assert_eq!(clarinet.normalized(), (-1, -2, 0));
    }

    #[test]
    fn test_measure_number_label() {
        let mut measure = Measure::new(1, 12);
        assert_eq!(measure.number_label(), "12");
        measure.suffix = Some("a".to_string());
        assert_eq!(measure.number_label(), "12a");
    }

    #[test]
    fn test_spanner_json_shape() {
        let json = r#"{"type": "wedge", "crescendo": true, "members": [3, 4]}"#;
        let spanner: Spanner = serde_json::from_str(json).unwrap();
        assert!(spanner.kind.is_direction());
        assert_eq!(spanner.members, vec![ElementId(3), ElementId(4)]);
    }
}
