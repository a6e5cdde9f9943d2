// Pitch mapping for MusicXML export

use crate::models::{Accidental, AccidentalDisplay, AccidentalKind, Clef, ClefSign, Pitch, Step};

use super::builder::{NodeId, XmlDocument};
use super::helpers::format_decimal;

/// MusicXML `<accidental>` text
pub fn accidental_xml_name(kind: AccidentalKind) -> &'static str {
    match kind {
        AccidentalKind::Sharp => "sharp",
        AccidentalKind::Flat => "flat",
        AccidentalKind::Natural => "natural",
        AccidentalKind::DoubleSharp => "double-sharp",
        AccidentalKind::DoubleFlat => "flat-flat",
        AccidentalKind::SharpSharp => "sharp-sharp",
        AccidentalKind::FlatFlat => "flat-flat",
        AccidentalKind::TripleSharp => "triple-sharp",
        AccidentalKind::TripleFlat => "triple-flat",
        AccidentalKind::NaturalSharp => "natural-sharp",
        AccidentalKind::NaturalFlat => "natural-flat",
        AccidentalKind::QuarterSharp => "quarter-sharp",
        AccidentalKind::QuarterFlat => "quarter-flat",
        AccidentalKind::ThreeQuartersSharp => "three-quarters-sharp",
        AccidentalKind::ThreeQuartersFlat => "three-quarters-flat",
    }
}

/// Write `<pitch>` with `<alter>` only when the pitch is altered
pub fn write_pitch(doc: &mut XmlDocument, note: NodeId, pitch: &Pitch) {
    let pitch_node = doc.element(note, "pitch");
    doc.text_element(pitch_node, "step", pitch.step.as_str());
    if pitch.alter != 0.0 {
        doc.text_element(pitch_node, "alter", &format_decimal(pitch.alter));
    }
    doc.text_element(pitch_node, "octave", &pitch.octave.to_string());
}

/// Write `<accidental>` unless its display status is hidden
pub fn write_accidental(doc: &mut XmlDocument, note: NodeId, accidental: Option<&Accidental>) {
    let accidental = match accidental {
        Some(a) if a.display != AccidentalDisplay::Hidden => a,
        _ => return,
    };
    let node = doc.text_element(note, "accidental", accidental_xml_name(accidental.kind));
    if accidental.cautionary {
        doc.set_attr(node, "cautionary", "yes");
    }
    if accidental.editorial {
        doc.set_attr(node, "editorial", "yes");
    }
    if accidental.parentheses {
        doc.set_attr(node, "parentheses", "yes");
    }
}

/// Diatonic number (octave * 7 + step) of the middle staff line under `clef`
pub fn clef_middle_line(clef: &Clef) -> i32 {
    // (reference pitch, line it sits on)
    let (reference, default_line) = match clef.sign {
        ClefSign::G => (4 * 7 + Step::G.index(), 2),
        ClefSign::F => (3 * 7 + Step::F.index(), 4),
        ClefSign::C => (4 * 7 + Step::C.index(), 3),
        // Unpitched staves use treble positions
        ClefSign::Percussion | ClefSign::Tab | ClefSign::None => return 4 * 7 + Step::B.index(),
    };
    let line = clef.line.map(i32::from).unwrap_or(default_line);
    reference + 2 * (3 - line) + 7 * i32::from(clef.octave_change)
}

/// Display step and octave for a rest shifted `step_shift` staff steps from the middle line
pub fn rest_display_position(clef: &Clef, step_shift: i32) -> (Step, i32) {
    let position = clef_middle_line(clef) + step_shift;
    (Step::from_index(position), position.div_euclid(7))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_line_treble_and_bass() {
        assert_eq!(clef_middle_line(&Clef::treble()), 34); // B4
        assert_eq!(clef_middle_line(&Clef::bass()), 22); // D3
        let alto = Clef { sign: ClefSign::C, line: Some(3), octave_change: 0 };
        assert_eq!(clef_middle_line(&alto), 28); // C4
    }

    #[test]
    fn test_middle_line_octave_clef() {
        let treble_8vb = Clef { sign: ClefSign::G, line: Some(2), octave_change: -1 };
        assert_eq!(clef_middle_line(&treble_8vb), 27); // B3
    }

    #[test]
    fn test_rest_display_position() {
        assert_eq!(rest_display_position(&Clef::treble(), 2), (Step::D, 5));
        assert_eq!(rest_display_position(&Clef::treble(), -4), (Step::E, 4));
        assert_eq!(rest_display_position(&Clef::bass(), 0), (Step::D, 3));
    }

    #[test]
    fn test_hidden_accidental_is_not_written() {
        let mut doc = XmlDocument::with_root("note");
        let root = doc.root().unwrap();
        let mut accidental = Accidental::new(AccidentalKind::Sharp);
        accidental.display = AccidentalDisplay::Hidden;
        write_accidental(&mut doc, root, Some(&accidental));
        assert!(doc.find_child(root, "accidental").is_none());

        accidental.display = AccidentalDisplay::Shown;
        accidental.cautionary = true;
        write_accidental(&mut doc, root, Some(&accidental));
        let node = doc.find_child(root, "accidental").unwrap();
        assert_eq!(doc.text(node), Some("sharp"));
        assert_eq!(doc.attr(node, "cautionary"), Some("yes"));
    }

    #[test]
    fn test_pitch_alter_omitted_when_natural() {
        let mut doc = XmlDocument::with_root("note");
        let root = doc.root().unwrap();
        write_pitch(&mut doc, root, &Pitch::new(Step::C, 0.0, 4));
        let pitch = doc.find_child(root, "pitch").unwrap();
        assert!(doc.find_child(pitch, "alter").is_none());

        let mut doc = XmlDocument::with_root("note");
        let root = doc.root().unwrap();
        write_pitch(&mut doc, root, &Pitch::new(Step::B, -0.5, 4));
        let pitch = doc.find_child(root, "pitch").unwrap();
        assert_eq!(doc.child_text(pitch, "alter"), Some("-0.5"));
    }
}
