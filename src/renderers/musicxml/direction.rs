//! `<direction>` and `<harmony>` writing
//!
//! Covers standalone directions (dynamics, words, tempo, rehearsal marks,
//! segno, coda), chord symbols, and the start/stop directions of wedges,
//! octave shifts, and bracket lines.

use crate::models::{
    Dynamic, ElementKind, Harmony, MetronomeMark, Placement, Spanner, SpannerKind, TextExpression,
};

use super::builder::{NodeId, XmlDocument};
use super::helpers::format_decimal;
use super::part::PartContext;
use super::spanners::SpannerRef;

/// Dynamics MusicXML has an element for
const KNOWN_DYNAMICS: &[&str] = &[
    "p", "pp", "ppp", "pppp", "ppppp", "pppppp", "f", "ff", "fff", "ffff", "fffff", "ffffff",
    "mp", "mf", "sf", "sfp", "sfpp", "fp", "rf", "rfz", "sfz", "sffz", "fz", "n", "pf", "sfzp",
];

/// Where a direction sits relative to the block cursor
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionPosition {
    /// Divisions past the cursor, written as `<offset>`
    pub offset: Option<u64>,
    pub voice: Option<u32>,
}

/// Write a direction-like element; returns false for kinds that are not directions
pub fn export_direction(
    doc: &mut XmlDocument,
    measure: NodeId,
    kind: &ElementKind,
    position: DirectionPosition,
) -> bool {
    match kind {
        ElementKind::Dynamic(dynamic) => write_dynamic(doc, measure, dynamic, position),
        ElementKind::TextExpression(text) => write_words(doc, measure, text, position),
        ElementKind::MetronomeMark(mark) => write_metronome(doc, measure, mark, position),
        ElementKind::RehearsalMark(mark) => {
            let direction = open_direction(doc, measure, Some(Placement::Above));
            let direction_type = doc.element(direction, "direction-type");
            doc.text_element(direction_type, "rehearsal", &mark.text);
            close_direction(doc, direction, position);
        }
        ElementKind::Segno | ElementKind::Coda => {
            let name = if matches!(kind, ElementKind::Segno) { "segno" } else { "coda" };
            let direction = open_direction(doc, measure, Some(Placement::Above));
            let direction_type = doc.element(direction, "direction-type");
            doc.element(direction_type, name);
            close_direction(doc, direction, position);
            let sound = doc.element(direction, "sound");
            doc.set_attr(sound, name, name);
        }
        ElementKind::Harmony(harmony) => write_harmony(doc, measure, harmony, position.offset),
        _ => return false,
    }
    true
}

fn open_direction(doc: &mut XmlDocument, measure: NodeId, placement: Option<Placement>) -> NodeId {
    let direction = doc.element(measure, "direction");
    if let Some(placement) = placement {
        doc.set_attr(direction, "placement", placement.xml_name());
    }
    direction
}

/// `offset?, voice?` after the direction types
fn close_direction(doc: &mut XmlDocument, direction: NodeId, position: DirectionPosition) {
    if let Some(offset) = position.offset.filter(|o| *o > 0) {
        doc.text_element(direction, "offset", &offset.to_string());
    }
    if let Some(voice) = position.voice {
        doc.text_element(direction, "voice", &voice.to_string());
    }
}

fn write_dynamic(doc: &mut XmlDocument, measure: NodeId, dynamic: &Dynamic, position: DirectionPosition) {
    let direction = open_direction(doc, measure, Some(dynamic.placement.unwrap_or(Placement::Below)));
    let direction_type = doc.element(direction, "direction-type");
    let dynamics = doc.element(direction_type, "dynamics");
    if KNOWN_DYNAMICS.contains(&dynamic.value.as_str()) {
        doc.element(dynamics, &dynamic.value);
    } else {
        doc.text_element(dynamics, "other-dynamics", &dynamic.value);
    }
    close_direction(doc, direction, position);
}

fn write_words(doc: &mut XmlDocument, measure: NodeId, text: &TextExpression, position: DirectionPosition) {
    let direction = open_direction(doc, measure, text.placement);
    let direction_type = doc.element(direction, "direction-type");
    let words = doc.text_element(direction_type, "words", &text.text);
    if text.italic {
        doc.set_attr(words, "font-style", "italic");
    }
    if text.bold {
        doc.set_attr(words, "font-weight", "bold");
    }
    close_direction(doc, direction, position);
}

fn write_metronome(doc: &mut XmlDocument, measure: NodeId, mark: &MetronomeMark, position: DirectionPosition) {
    let direction = open_direction(doc, measure, Some(mark.placement.unwrap_or(Placement::Above)));
    if let Some(text) = &mark.text {
        let direction_type = doc.element(direction, "direction-type");
        doc.text_element(direction_type, "words", text);
    }
    if let Some(per_minute) = mark.per_minute {
        let direction_type = doc.element(direction, "direction-type");
        let metronome = doc.element(direction_type, "metronome");
        if mark.parentheses {
            doc.set_attr(metronome, "parentheses", "yes");
        }
        doc.text_element(metronome, "beat-unit", mark.beat_unit.xml_name());
        for _ in 0..mark.beat_unit_dots {
            doc.element(metronome, "beat-unit-dot");
        }
        doc.text_element(metronome, "per-minute", &format_decimal(per_minute));
    }
    if doc.children(direction).is_empty() {
        // Nothing to show; a direction needs at least one direction-type
        doc.detach(direction);
        return;
    }
    close_direction(doc, direction, position);
    if let Some(per_minute) = mark.per_minute {
        let sound = doc.element(direction, "sound");
        doc.set_attr(sound, "tempo", &format_decimal(quarter_bpm(mark, per_minute)));
    }
}

/// Tempo in quarter notes per minute
fn quarter_bpm(mark: &MetronomeMark, per_minute: f64) -> f64 {
    let base = mark.beat_unit.quarter_length();
    let mut beat = *base.numer() as f64 / *base.denom() as f64;
    let mut dot = beat / 2.0;
    for _ in 0..mark.beat_unit_dots {
        beat += dot;
        dot /= 2.0;
    }
    per_minute * beat
}

fn write_harmony(doc: &mut XmlDocument, measure: NodeId, harmony: &Harmony, offset: Option<u64>) {
    let node = doc.element(measure, "harmony");
    let root = doc.element(node, "root");
    doc.text_element(root, "root-step", harmony.root.step.as_str());
    if harmony.root.alter != 0.0 {
        doc.text_element(root, "root-alter", &format_decimal(harmony.root.alter));
    }
    let kind = doc.text_element(node, "kind", &harmony.kind);
    if let Some(text) = &harmony.kind_text {
        doc.set_attr(kind, "text", text);
    }
    if let Some(bass) = &harmony.bass {
        let bass_node = doc.element(node, "bass");
        doc.text_element(bass_node, "bass-step", bass.step.as_str());
        if bass.alter != 0.0 {
            doc.text_element(bass_node, "bass-alter", &format_decimal(bass.alter));
        }
    }
    if let Some(offset) = offset.filter(|o| *o > 0) {
        doc.text_element(node, "offset", &offset.to_string());
    }
}

/// Write the start (`start == true`) or stop direction of a wedge, octave shift, or line
pub fn export_spanner_direction(
    doc: &mut XmlDocument,
    measure: NodeId,
    ctx: &mut PartContext,
    membership: SpannerRef,
    spanner: &Spanner,
    start: bool,
    voice: Option<u32>,
) {
    let number = ctx.numbers.number_for(membership.spanner, spanner.kind.family()).to_string();
    let placement = match &spanner.kind {
        SpannerKind::Wedge { placement, .. } => Some(placement.unwrap_or(Placement::Below)),
        SpannerKind::Ottava { shift } => Some(if *shift > 0 { Placement::Above } else { Placement::Below }),
        _ => None,
    };
    let direction = open_direction(doc, measure, if start { placement } else { None });
    let direction_type = doc.element(direction, "direction-type");

    match &spanner.kind {
        SpannerKind::Wedge { crescendo, .. } => {
            let kind = match (start, crescendo) {
                (false, _) => "stop",
                (true, true) => "crescendo",
                (true, false) => "diminuendo",
            };
            doc.empty_element(direction_type, "wedge", &[("type", kind), ("number", number.as_str())]);
        }
        SpannerKind::Ottava { shift } => {
            // 8va lifts the sounding pitch, so the written notes are shifted down
            let kind = match (start, *shift > 0) {
                (false, _) => "stop",
                (true, true) => "down",
                (true, false) => "up",
            };
            let size = shift.unsigned_abs().to_string();
            doc.empty_element(
                direction_type,
                "octave-shift",
                &[("type", kind), ("number", number.as_str()), ("size", size.as_str())],
            );
        }
        SpannerKind::Line { line_type, start_hook, end_hook } => {
            let hook = if start { *start_hook } else { *end_hook };
            let node = doc.empty_element(
                direction_type,
                "bracket",
                &[
                    ("type", if start { "start" } else { "stop" }),
                    ("number", number.as_str()),
                    ("line-end", if hook { "down" } else { "none" }),
                ],
            );
            if start {
                if let Some(line_type) = line_type {
                    doc.set_attr(node, "line-type", line_type.xml_name());
                }
            }
        }
        _ => {}
    }

    close_direction(doc, direction, DirectionPosition { offset: None, voice });
    if !start {
        ctx.numbers.release(membership.spanner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteType;

    fn mark(beat_unit: NoteType, dots: u8) -> MetronomeMark {
        MetronomeMark {
            beat_unit,
            beat_unit_dots: dots,
            per_minute: Some(60.0),
            text: None,
            parentheses: false,
            placement: None,
        }
    }

    #[test]
    fn test_quarter_bpm() {
        assert_eq!(quarter_bpm(&mark(NoteType::Quarter, 0), 60.0), 60.0);
        assert_eq!(quarter_bpm(&mark(NoteType::Quarter, 1), 60.0), 90.0);
        assert_eq!(quarter_bpm(&mark(NoteType::Half, 0), 60.0), 120.0);
    }

    #[test]
    fn test_unknown_dynamic_becomes_other() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        let dynamic = Dynamic { value: "ffz".to_string(), placement: None };
        export_direction(&mut doc, measure, &ElementKind::Dynamic(dynamic), DirectionPosition::default());
        let xml = doc.to_xml_string(0).unwrap();
        assert!(xml.contains("<other-dynamics>ffz</other-dynamics>"));
        assert!(xml.contains(r#"<direction placement="below">"#));
    }

    #[test]
    fn test_direction_offset_and_voice_order() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        let position = DirectionPosition { offset: Some(2), voice: Some(1) };
        export_direction(&mut doc, measure, &ElementKind::Segno, position);
        let direction = doc.find_child(measure, "direction").unwrap();
        let tags: Vec<_> = doc.children(direction).iter().map(|&c| doc.tag(c).unwrap()).collect();
        assert_eq!(tags, vec!["direction-type", "offset", "voice", "sound"]);
    }

    #[test]
    fn test_metronome_writes_sound_tempo() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        let mut tempo = mark(NoteType::Quarter, 1);
        tempo.per_minute = Some(80.0);
        export_direction(&mut doc, measure, &ElementKind::MetronomeMark(tempo), DirectionPosition::default());
        let xml = doc.to_xml_string(0).unwrap();
        assert!(xml.contains("<beat-unit>quarter</beat-unit><beat-unit-dot/><per-minute>80</per-minute>"));
        assert!(xml.contains(r#"<sound tempo="120"/>"#));
    }
}
