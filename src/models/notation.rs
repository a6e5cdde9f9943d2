//! Rhythm and notation attached to notes
//!
//! Durations, tuplets, beams, ties, and the marks that end up inside
//! `<notations>`. Beam and tuplet labels are kept as free text when they do
//! not match a known value so the exporter can report them instead of the
//! JSON layer silently rejecting the whole score.

use serde::{Deserialize, Serialize};

use super::core::QuarterLength;
use super::serde_helpers;

/// Graphic note value
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoteType {
    #[serde(rename = "1024th")]
    N1024th,
    #[serde(rename = "512th")]
    N512th,
    #[serde(rename = "256th")]
    N256th,
    #[serde(rename = "128th")]
    N128th,
    #[serde(rename = "64th")]
    N64th,
    #[serde(rename = "32nd")]
    N32nd,
    #[serde(rename = "16th")]
    N16th,
    #[serde(rename = "eighth")]
    Eighth,
    #[serde(rename = "quarter")]
    Quarter,
    #[serde(rename = "half")]
    Half,
    #[serde(rename = "whole")]
    Whole,
    #[serde(rename = "breve")]
    Breve,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "maxima")]
    Maxima,
}

impl NoteType {
    pub const ALL: [NoteType; 14] = [
        NoteType::N1024th,
        NoteType::N512th,
        NoteType::N256th,
        NoteType::N128th,
        NoteType::N64th,
        NoteType::N32nd,
        NoteType::N16th,
        NoteType::Eighth,
        NoteType::Quarter,
        NoteType::Half,
        NoteType::Whole,
        NoteType::Breve,
        NoteType::Long,
        NoteType::Maxima,
    ];

    /// MusicXML `<type>` text
    pub fn xml_name(&self) -> &'static str {
        match self {
            NoteType::N1024th => "1024th",
            NoteType::N512th => "512th",
            NoteType::N256th => "256th",
            NoteType::N128th => "128th",
            NoteType::N64th => "64th",
            NoteType::N32nd => "32nd",
            NoteType::N16th => "16th",
            NoteType::Eighth => "eighth",
            NoteType::Quarter => "quarter",
            NoteType::Half => "half",
            NoteType::Whole => "whole",
            NoteType::Breve => "breve",
            NoteType::Long => "long",
            NoteType::Maxima => "maxima",
        }
    }

    /// Undotted length in quarter notes
    pub fn quarter_length(&self) -> QuarterLength {
        let exponent = NoteType::ALL
            .iter()
            .position(|t| t == self)
            .unwrap_or(8) as i32
            - 8;
        if exponent >= 0 {
            QuarterLength::from_integer(1 << exponent)
        } else {
            QuarterLength::new(1, 1 << (-exponent))
        }
    }
}

/// Written duration of a note, rest, or chord
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Duration {
    /// Sounding length; zero for grace notes
    #[serde(with = "serde_helpers::quarter_length")]
    pub quarter_length: QuarterLength,
    /// Inferred from the length when absent
    #[serde(default)]
    pub note_type: Option<NoteType>,
    #[serde(default)]
    pub dots: u8,
    /// Outermost first
    #[serde(default)]
    pub tuplets: Vec<Tuplet>,
}

impl Duration {
    pub fn new(quarter_length: QuarterLength) -> Self {
        Self {
            quarter_length,
            note_type: None,
            dots: 0,
            tuplets: Vec::new(),
        }
    }

    pub fn quarters(numer: i64, denom: i64) -> Self {
        Self::new(QuarterLength::new(numer, denom))
    }

    /// Product of all tuplet ratios as `(actual, normal)`
    ///
    /// `None` when a ratio has a zero side or the product overflows.
    pub fn tuplet_ratio(&self) -> Option<(u32, u32)> {
        self.tuplets.iter().try_fold((1u32, 1u32), |(actual, normal), t| {
            if t.actual == 0 || t.normal == 0 {
                return None;
            }
            Some((actual.checked_mul(t.actual)?, normal.checked_mul(t.normal)?))
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tuplet {
    pub actual: u32,
    pub normal: u32,
    #[serde(default)]
    pub normal_type: Option<NoteType>,
    #[serde(default)]
    pub normal_dots: u8,
    /// Bracket boundary carried by this note, if any
    #[serde(default)]
    pub boundary: Option<TupletBoundary>,
    #[serde(default)]
    pub bracket: Option<bool>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub show_number: Option<ShowNumber>,
}

impl Tuplet {
    pub fn new(actual: u32, normal: u32) -> Self {
        Self {
            actual,
            normal,
            normal_type: None,
            normal_dots: 0,
            boundary: None,
            bracket: None,
            placement: None,
            show_number: None,
        }
    }

    pub fn with_boundary(mut self, boundary: TupletBoundary) -> Self {
        self.boundary = Some(boundary);
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TupletBoundary {
    Start,
    Stop,
    StartStop,
    Other(String),
}

impl From<String> for TupletBoundary {
    fn from(label: String) -> Self {
        match label.as_str() {
            "start" => TupletBoundary::Start,
            "stop" => TupletBoundary::Stop,
            "startStop" | "start-stop" => TupletBoundary::StartStop,
            _ => TupletBoundary::Other(label),
        }
    }
}

impl From<TupletBoundary> for String {
    fn from(boundary: TupletBoundary) -> Self {
        match boundary {
            TupletBoundary::Start => "start".to_string(),
            TupletBoundary::Stop => "stop".to_string(),
            TupletBoundary::StartStop => "startStop".to_string(),
            TupletBoundary::Other(label) => label,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShowNumber {
    Actual,
    Both,
    None,
}

impl ShowNumber {
    pub fn xml_name(&self) -> &'static str {
        match self {
            ShowNumber::Actual => "actual",
            ShowNumber::Both => "both",
            ShowNumber::None => "none",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Above,
    Below,
}

impl Placement {
    pub fn xml_name(&self) -> &'static str {
        match self {
            Placement::Above => "above",
            Placement::Below => "below",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Solid,
    Dashed,
    Dotted,
    Wavy,
}

impl LineType {
    pub fn xml_name(&self) -> &'static str {
        match self {
            LineType::Solid => "solid",
            LineType::Dashed => "dashed",
            LineType::Dotted => "dotted",
            LineType::Wavy => "wavy",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Beam {
    pub kind: BeamKind,
    /// Hook direction, only meaningful for partial beams
    #[serde(default)]
    pub direction: Option<BeamDirection>,
    /// Beam level; defaults to its position in the list
    #[serde(default)]
    pub number: Option<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum BeamKind {
    Start,
    Continue,
    Stop,
    Partial,
    Other(String),
}

impl From<String> for BeamKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "start" => BeamKind::Start,
            "continue" => BeamKind::Continue,
            "stop" => BeamKind::Stop,
            "partial" => BeamKind::Partial,
            _ => BeamKind::Other(label),
        }
    }
}

impl From<BeamKind> for String {
    fn from(kind: BeamKind) -> Self {
        match kind {
            BeamKind::Start => "start".to_string(),
            BeamKind::Continue => "continue".to_string(),
            BeamKind::Stop => "stop".to_string(),
            BeamKind::Partial => "partial".to_string(),
            BeamKind::Other(label) => label,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeamDirection {
    Left,
    Right,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TieKind {
    Start,
    Stop,
    Continue,
    LetRing,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Articulation {
    Accent,
    StrongAccent,
    Staccato,
    Staccatissimo,
    Tenuto,
    DetachedLegato,
    Spiccato,
    Stress,
    Unstress,
    SoftAccent,
    Scoop,
    Plop,
    Doit,
    Falloff,
    BreathMark,
    Caesura,
}

impl Articulation {
    pub fn xml_name(&self) -> &'static str {
        match self {
            Articulation::Accent => "accent",
            Articulation::StrongAccent => "strong-accent",
            Articulation::Staccato => "staccato",
            Articulation::Staccatissimo => "staccatissimo",
            Articulation::Tenuto => "tenuto",
            Articulation::DetachedLegato => "detached-legato",
            Articulation::Spiccato => "spiccato",
            Articulation::Stress => "stress",
            Articulation::Unstress => "unstress",
            Articulation::SoftAccent => "soft-accent",
            Articulation::Scoop => "scoop",
            Articulation::Plop => "plop",
            Articulation::Doit => "doit",
            Articulation::Falloff => "falloff",
            Articulation::BreathMark => "breath-mark",
            Articulation::Caesura => "caesura",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Technical {
    UpBow,
    DownBow,
    Harmonic,
    OpenString,
    Stopped,
    SnapPizzicato,
    Fingering {
        value: String,
        #[serde(default)]
        substitution: bool,
    },
}

impl Technical {
    pub fn xml_name(&self) -> &'static str {
        match self {
            Technical::UpBow => "up-bow",
            Technical::DownBow => "down-bow",
            Technical::Harmonic => "harmonic",
            Technical::OpenString => "open-string",
            Technical::Stopped => "stopped",
            Technical::SnapPizzicato => "snap-pizzicato",
            Technical::Fingering { .. } => "fingering",
        }
    }
}

/// Ornaments and fermatas
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Expression {
    TrillMark,
    Turn,
    InvertedTurn,
    Mordent,
    InvertedMordent,
    /// Single-note tremolo
    Tremolo { marks: u8 },
    Fermata {
        #[serde(default)]
        inverted: bool,
        #[serde(default)]
        shape: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StemDirection {
    Up,
    Down,
    Double,
    None,
}

impl StemDirection {
    pub fn xml_name(&self) -> &'static str {
        match self {
            StemDirection::Up => "up",
            StemDirection::Down => "down",
            StemDirection::Double => "double",
            StemDirection::None => "none",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Syllabic {
    Single,
    Begin,
    Middle,
    End,
}

impl Syllabic {
    pub fn xml_name(&self) -> &'static str {
        match self {
            Syllabic::Single => "single",
            Syllabic::Begin => "begin",
            Syllabic::Middle => "middle",
            Syllabic::End => "end",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Lyric {
    pub text: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub syllabic: Option<Syllabic>,
    #[serde(default)]
    pub extend: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Grace {
    #[serde(default)]
    pub slash: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notehead {
    /// MusicXML notehead value such as `x`, `diamond`, `slash`
    pub shape: String,
    #[serde(default)]
    pub filled: Option<bool>,
    #[serde(default)]
    pub parentheses: bool,
}

/// Marks shared by every tone of a note or chord
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NoteMarks {
    pub grace: Option<Grace>,
    pub beams: Vec<Beam>,
    pub articulations: Vec<Articulation>,
    pub technical: Vec<Technical>,
    pub expressions: Vec<Expression>,
    pub stem: Option<StemDirection>,
    pub lyrics: Vec<Lyric>,
    pub arpeggiate: bool,
    /// Bracket the chord with `<non-arpeggiate>`
    pub non_arpeggiate: bool,
}
