// Shared score builders for the integration tests

#![allow(dead_code)]

use musicxml_export::models::{
    Chord, ChordTone, Duration, ElementKind, Measure, MeasureElement, Note, Part, Pitch, QuarterLength, Rest,
    Step, TimeSignature,
};

/// Hands out element ids that never collide within one test
pub struct Ids(u32);

impl Ids {
    pub fn new() -> Self {
        Ids(1000)
    }

    pub fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

pub fn ql(numer: i64, denom: i64) -> QuarterLength {
    QuarterLength::new(numer, denom)
}

pub fn note(ids: &mut Ids, offset: QuarterLength, step: Step, octave: i8, length: QuarterLength) -> MeasureElement {
    MeasureElement::new(
        ids.next(),
        offset,
        ElementKind::Note(Note::new(Pitch::new(step, 0.0, octave), Duration::new(length))),
    )
}

pub fn rest(ids: &mut Ids, offset: QuarterLength, length: QuarterLength) -> MeasureElement {
    MeasureElement::new(ids.next(), offset, ElementKind::Rest(Rest::new(Duration::new(length))))
}

pub fn chord(ids: &mut Ids, offset: QuarterLength, pitches: &[(Step, i8)], length: QuarterLength) -> MeasureElement {
    let tones = pitches
        .iter()
        .map(|(step, octave)| ChordTone::new(Pitch::new(*step, 0.0, *octave)))
        .collect();
    MeasureElement::new(
        ids.next(),
        offset,
        ElementKind::Chord(Chord { tones, duration: Duration::new(length), marks: Default::default() }),
    )
}

pub fn time(ids: &mut Ids, beats: u32, beat_type: u32) -> MeasureElement {
    MeasureElement::new(ids.next(), ql(0, 1), ElementKind::TimeSignature(TimeSignature::new(beats, beat_type)))
}

/// Part with one measure per number, each holding a single whole note
pub fn whole_note_part(ids: &mut Ids, numbers: &[u32], step: Step, octave: i8) -> Part {
    let measures = numbers
        .iter()
        .map(|&number| {
            let mut measure = Measure::new(ids.next(), number);
            measure.elements.push(note(ids, ql(0, 1), step, octave, ql(4, 1)));
            measure
        })
        .collect();
    Part { measures, ..Part::default() }
}

/// Parse exported MusicXML, which always carries a DOCTYPE
pub fn parse(xml: &str) -> roxmltree::Document<'_> {
    let options = roxmltree::ParsingOptions { allow_dtd: true, ..roxmltree::ParsingOptions::default() };
    roxmltree::Document::parse_with_options(xml, options).expect("exported MusicXML should parse")
}

/// Every element child of `node` with the given tag
pub fn children<'a, 'input>(node: roxmltree::Node<'a, 'input>, tag: &str) -> Vec<roxmltree::Node<'a, 'input>> {
    node.children().filter(|c| c.has_tag_name(tag)).collect()
}

pub fn child_text<'a>(node: roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children().find(|c| c.has_tag_name(tag)).and_then(|c| c.text())
}
