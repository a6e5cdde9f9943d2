//! `<note>` writing for notes, chords, unpitched notes, and rests
//!
//! A chord of N tones becomes N `<note>` elements. The first one carries
//! the shared information (stem, beams, slurs, tuplet brackets, ornaments,
//! lyrics); the others carry `<chord/>` and only what each tone owns.

use crate::models::{
    Accidental, Articulation, Beam, BeamDirection, BeamKind, Duration, ElementId, ElementKind,
    Expression, MeasureElement, NoteMarks, Notehead, Pitch, Rest, SpannerKind, Step, Technical,
    TieKind, TupletBoundary,
};

use super::builder::{NodeId, XmlDocument};
use super::duration::resolve_note_type;
use super::errors::{ExportError, ExportErrorKind, ExportResult};
use super::part::PartContext;
use super::pitch::{rest_display_position, write_accidental, write_pitch};

/// What sits in the pitch slot of one `<note>`
enum ToneBody<'e> {
    Pitched(&'e Pitch),
    Unpitched(Step, i8),
}

/// One tone of a note or chord
struct Tone<'e> {
    body: ToneBody<'e>,
    tie: Option<TieKind>,
    notehead: Option<&'e Notehead>,
}

impl<'e> Tone<'e> {
    fn accidental(&self) -> Option<&'e Accidental> {
        match self.body {
            ToneBody::Pitched(pitch) => pitch.accidental.as_ref(),
            ToneBody::Unpitched(..) => None,
        }
    }
}

/// Write a note, unpitched note, or chord; other kinds are ignored
pub fn export_note_or_chord(
    doc: &mut XmlDocument,
    measure: NodeId,
    ctx: &mut PartContext,
    element: &MeasureElement,
    voice: Option<u32>,
) -> ExportResult<()> {
    let (tones, duration, marks) = match &element.kind {
        ElementKind::Note(note) => (
            vec![Tone { body: ToneBody::Pitched(&note.pitch), tie: note.tie, notehead: note.notehead.as_ref() }],
            &note.duration,
            &note.marks,
        ),
        ElementKind::Unpitched(note) => (
            vec![Tone {
                body: ToneBody::Unpitched(note.display_step, note.display_octave),
                tie: note.tie,
                notehead: note.notehead.as_ref(),
            }],
            &note.duration,
            &note.marks,
        ),
        ElementKind::Chord(chord) => (
            chord
                .tones
                .iter()
                .map(|t| Tone { body: ToneBody::Pitched(&t.pitch), tie: t.tie, notehead: t.notehead.as_ref() })
                .collect(),
            &chord.duration,
            &chord.marks,
        ),
        _ => return Ok(()),
    };

    validate_beams(&marks.beams)?;
    let is_grace = marks.grace.is_some();
    let units = if is_grace { 0 } else { ctx.units(duration.quarter_length)? };
    let note_type = resolve_note_type(duration);
    let last = tones.len().saturating_sub(1);
    let mut released = Vec::new();

    for (i, tone) in tones.iter().enumerate() {
        let first = i == 0;
        let note = doc.element(measure, "note");

        if let Some(grace) = &marks.grace {
            let grace_node = doc.element(note, "grace");
            if grace.slash {
                doc.set_attr(grace_node, "slash", "yes");
            }
        }
        if !first {
            doc.element(note, "chord");
        }
        match tone.body {
            ToneBody::Pitched(pitch) => write_pitch(doc, note, pitch),
            ToneBody::Unpitched(step, octave) => {
                let unpitched = doc.element(note, "unpitched");
                doc.text_element(unpitched, "display-step", step.as_str());
                doc.text_element(unpitched, "display-octave", &octave.to_string());
            }
        }
        if !is_grace {
            doc.text_element(note, "duration", &units.to_string());
        }
        write_ties(doc, note, tone.tie);
        if let Some(v) = voice {
            doc.text_element(note, "voice", &v.to_string());
        }
        if let Some((note_type, dots)) = note_type {
            doc.text_element(note, "type", note_type.xml_name());
            for _ in 0..dots {
                doc.element(note, "dot");
            }
        }
        write_accidental(doc, note, tone.accidental());
        write_time_modification(doc, note, duration);
        if first {
            if let Some(stem) = marks.stem {
                doc.text_element(note, "stem", stem.xml_name());
            }
        }
        if let Some(notehead) = tone.notehead {
            write_notehead(doc, note, notehead);
        }
        if first {
            write_beams(doc, note, &marks.beams);
        }

        let notations = doc.create_element("notations");
        write_tied(doc, notations, tone.tie);
        if first {
            write_spanner_notations(doc, notations, ctx, element.id, &mut released);
            write_tuplet_markers(doc, notations, duration)?;
            write_glissandos(doc, notations, ctx, element.id, &mut released);
            write_ornaments(doc, notations, ctx, element.id, marks, &mut released);
            write_technical(doc, notations, &marks.technical);
            write_articulations(doc, notations, &marks.articulations);
            write_fermatas(doc, notations, &marks.expressions);
        }
        if marks.arpeggiate {
            doc.element(notations, "arpeggiate");
        }
        if marks.non_arpeggiate && tones.len() > 1 && (first || i == last) {
            let node = doc.element(notations, "non-arpeggiate");
            doc.set_attr(node, "type", if first { "bottom" } else { "top" });
        }
        if !doc.children(notations).is_empty() {
            doc.append(note, notations);
        }

        if first {
            write_lyrics(doc, note, marks);
        }
    }

    for spanner in released {
        ctx.numbers.release(spanner);
    }
    Ok(())
}

/// Write a rest, as a measure rest when it fills the bar
pub fn export_rest(
    doc: &mut XmlDocument,
    measure: NodeId,
    ctx: &mut PartContext,
    element: &MeasureElement,
    rest: &Rest,
    voice: Option<u32>,
) -> ExportResult<()> {
    let units = ctx.units(rest.duration.quarter_length)?;
    let full_measure = rest.full_measure || rest.duration.quarter_length == ctx.bar_duration();

    let note = doc.element(measure, "note");
    let rest_node = doc.element(note, "rest");
    if full_measure {
        doc.set_attr(rest_node, "measure", "yes");
    }
    let shift = rest.step_shift.unwrap_or(ctx.config.export.rest_step_shift);
    if shift != 0 {
        let (step, octave) = rest_display_position(&ctx.clef, shift);
        doc.text_element(rest_node, "display-step", step.as_str());
        doc.text_element(rest_node, "display-octave", &octave.to_string());
    }

    doc.text_element(note, "duration", &units.to_string());
    if let Some(v) = voice {
        doc.text_element(note, "voice", &v.to_string());
    }
    if !full_measure {
        if let Some((note_type, dots)) = resolve_note_type(&rest.duration) {
            doc.text_element(note, "type", note_type.xml_name());
            for _ in 0..dots {
                doc.element(note, "dot");
            }
        }
    }
    write_time_modification(doc, note, &rest.duration);

    let mut released = Vec::new();
    let notations = doc.create_element("notations");
    write_spanner_notations(doc, notations, ctx, element.id, &mut released);
    write_tuplet_markers(doc, notations, &rest.duration)?;
    write_fermatas(doc, notations, &rest.marks.expressions);
    if !doc.children(notations).is_empty() {
        doc.append(note, notations);
    }
    for spanner in released {
        ctx.numbers.release(spanner);
    }
    Ok(())
}

/// Reject beams MusicXML cannot express
pub fn validate_beams(beams: &[Beam]) -> ExportResult<()> {
    for beam in beams {
        match (&beam.kind, beam.direction) {
            (BeamKind::Partial, None) => {
                return Err(ExportError::new(ExportErrorKind::InvalidBeam(
                    "partial beam without direction".to_string(),
                )))
            }
            (BeamKind::Partial, Some(_)) => {}
            (BeamKind::Other(label), _) => {
                return Err(ExportError::new(ExportErrorKind::InvalidBeam(format!(
                    "unknown beam type '{}'",
                    label
                ))))
            }
            (kind, Some(_)) => {
                return Err(ExportError::new(ExportErrorKind::InvalidBeam(format!(
                    "direction given for non-partial beam '{}'",
                    String::from(kind.clone())
                ))))
            }
            (_, None) => {}
        }
    }
    Ok(())
}

fn write_beams(doc: &mut XmlDocument, note: NodeId, beams: &[Beam]) {
    for (i, beam) in beams.iter().enumerate() {
        let value = match (&beam.kind, beam.direction) {
            (BeamKind::Start, _) => "begin",
            (BeamKind::Continue, _) => "continue",
            (BeamKind::Stop, _) => "end",
            (BeamKind::Partial, Some(BeamDirection::Right)) => "forward hook",
            (BeamKind::Partial, _) => "backward hook",
            (BeamKind::Other(_), _) => continue,
        };
        let node = doc.text_element(note, "beam", value);
        let number = beam.number.map(u32::from).unwrap_or(i as u32 + 1);
        doc.set_attr(node, "number", &number.to_string());
    }
}

fn write_ties(doc: &mut XmlDocument, note: NodeId, tie: Option<TieKind>) {
    let types: &[&str] = match tie {
        Some(TieKind::Start) => &["start"],
        Some(TieKind::Stop) => &["stop"],
        Some(TieKind::Continue) => &["stop", "start"],
        Some(TieKind::LetRing) | None => &[],
    };
    for &t in types {
        doc.empty_element(note, "tie", &[("type", t)]);
    }
}

fn write_tied(doc: &mut XmlDocument, notations: NodeId, tie: Option<TieKind>) {
    let types: &[&str] = match tie {
        Some(TieKind::Start) => &["start"],
        Some(TieKind::Stop) => &["stop"],
        Some(TieKind::Continue) => &["stop", "start"],
        Some(TieKind::LetRing) => &["let-ring"],
        None => &[],
    };
    for &t in types {
        doc.empty_element(notations, "tied", &[("type", t)]);
    }
}

fn write_time_modification(doc: &mut XmlDocument, note: NodeId, duration: &Duration) {
    if duration.tuplets.is_empty() {
        return;
    }
    let Some((actual, normal)) = duration.tuplet_ratio() else {
        return;
    };
    let node = doc.element(note, "time-modification");
    doc.text_element(node, "actual-notes", &actual.to_string());
    doc.text_element(node, "normal-notes", &normal.to_string());
    if let Some(innermost) = duration.tuplets.last() {
        if let Some(normal_type) = innermost.normal_type {
            doc.text_element(node, "normal-type", normal_type.xml_name());
            for _ in 0..innermost.normal_dots {
                doc.element(node, "normal-dot");
            }
        }
    }
}

fn write_notehead(doc: &mut XmlDocument, note: NodeId, notehead: &Notehead) {
    let node = doc.text_element(note, "notehead", &notehead.shape);
    if let Some(filled) = notehead.filled {
        doc.set_attr(node, "filled", if filled { "yes" } else { "no" });
    }
    if notehead.parentheses {
        doc.set_attr(node, "parentheses", "yes");
    }
}

/// Start and stop markers for one spanner membership
fn marker_types(is_first: bool, is_last: bool) -> &'static [&'static str] {
    match (is_first, is_last) {
        (true, true) => &["start", "stop"],
        (true, false) => &["start"],
        (false, true) => &["stop"],
        (false, false) => &[],
    }
}

fn write_spanner_notations(
    doc: &mut XmlDocument,
    notations: NodeId,
    ctx: &mut PartContext,
    id: ElementId,
    released: &mut Vec<usize>,
) {
    for (membership, spanner) in ctx.spanners.select(id, |k| matches!(k, SpannerKind::Slur { .. })) {
        let number = ctx.numbers.number_for(membership.spanner, spanner.kind.family());
        let number = number.to_string();
        for &t in marker_types(membership.is_first, membership.is_last) {
            let node = doc.empty_element(notations, "slur", &[("type", t), ("number", number.as_str())]);
            if let SpannerKind::Slur { placement: Some(placement) } = &spanner.kind {
                if t == "start" {
                    doc.set_attr(node, "placement", placement.xml_name());
                }
            }
        }
        if membership.is_last {
            released.push(membership.spanner);
        }
    }
}

fn write_tuplet_markers(doc: &mut XmlDocument, notations: NodeId, duration: &Duration) -> ExportResult<()> {
    let nested = duration.tuplets.len() > 1;
    for (i, tuplet) in duration.tuplets.iter().enumerate() {
        let (start, stop) = match &tuplet.boundary {
            None => continue,
            Some(TupletBoundary::Start) => (true, false),
            Some(TupletBoundary::Stop) => (false, true),
            Some(TupletBoundary::StartStop) => (true, true),
            Some(TupletBoundary::Other(label)) => {
                return Err(ExportError::new(ExportErrorKind::InvalidTupletBoundary(label.clone())))
            }
        };
        if start {
            let node = doc.empty_element(notations, "tuplet", &[("type", "start")]);
            if nested {
                doc.set_attr(node, "number", &(i + 1).to_string());
            }
            if let Some(bracket) = tuplet.bracket {
                doc.set_attr(node, "bracket", if bracket { "yes" } else { "no" });
            }
            if let Some(placement) = tuplet.placement {
                doc.set_attr(node, "placement", placement.xml_name());
            }
            if let Some(show) = tuplet.show_number {
                doc.set_attr(node, "show-number", show.xml_name());
            }
        }
        if stop {
            let node = doc.empty_element(notations, "tuplet", &[("type", "stop")]);
            if nested {
                doc.set_attr(node, "number", &(i + 1).to_string());
            }
        }
    }
    Ok(())
}

fn write_glissandos(
    doc: &mut XmlDocument,
    notations: NodeId,
    ctx: &mut PartContext,
    id: ElementId,
    released: &mut Vec<usize>,
) {
    for (membership, spanner) in ctx.spanners.select(id, |k| matches!(k, SpannerKind::Glissando { .. })) {
        let SpannerKind::Glissando { line_type, text } = &spanner.kind else {
            continue;
        };
        let number = ctx.numbers.number_for(membership.spanner, spanner.kind.family());
        let number = number.to_string();
        for &t in marker_types(membership.is_first, membership.is_last) {
            let node = doc.empty_element(notations, "glissando", &[("type", t), ("number", number.as_str())]);
            if t == "start" {
                if let Some(line_type) = line_type {
                    doc.set_attr(node, "line-type", line_type.xml_name());
                }
                if let Some(text) = text {
                    doc.set_text(node, text);
                }
            }
        }
        if membership.is_last {
            released.push(membership.spanner);
        }
    }
}

fn write_ornaments(
    doc: &mut XmlDocument,
    notations: NodeId,
    ctx: &mut PartContext,
    id: ElementId,
    marks: &NoteMarks,
    released: &mut Vec<usize>,
) {
    let ornaments = doc.create_element("ornaments");

    for expression in &marks.expressions {
        let name = match expression {
            Expression::TrillMark => "trill-mark",
            Expression::Turn => "turn",
            Expression::InvertedTurn => "inverted-turn",
            Expression::Mordent => "mordent",
            Expression::InvertedMordent => "inverted-mordent",
            Expression::Tremolo { .. } | Expression::Fermata { .. } => continue,
        };
        doc.element(ornaments, name);
    }

    for expression in &marks.expressions {
        if let Expression::Tremolo { marks } = expression {
            let node = doc.text_element(ornaments, "tremolo", &marks.to_string());
            doc.set_attr(node, "type", "single");
        }
    }

    for (membership, spanner) in ctx.spanners.select(id, |k| matches!(k, SpannerKind::Tremolo { .. })) {
        if let SpannerKind::Tremolo { marks } = spanner.kind {
            for &t in marker_types(membership.is_first, membership.is_last) {
                let node = doc.text_element(ornaments, "tremolo", &marks.to_string());
                doc.set_attr(node, "type", t);
            }
        }
    }

    for (membership, spanner) in ctx.spanners.select(id, |k| matches!(k, SpannerKind::TrillExtension)) {
        let number = ctx.numbers.number_for(membership.spanner, spanner.kind.family());
        let number = number.to_string();
        for &t in marker_types(membership.is_first, membership.is_last) {
            doc.empty_element(ornaments, "wavy-line", &[("type", t), ("number", number.as_str())]);
        }
        if membership.is_last {
            released.push(membership.spanner);
        }
    }

    if !doc.children(ornaments).is_empty() {
        doc.append(notations, ornaments);
    }
}

fn write_technical(doc: &mut XmlDocument, notations: NodeId, technical: &[Technical]) {
    if technical.is_empty() {
        return;
    }
    let node = doc.element(notations, "technical");
    for mark in technical {
        match mark {
            Technical::Fingering { value, substitution } => {
                let fingering = doc.text_element(node, "fingering", value);
                if *substitution {
                    doc.set_attr(fingering, "substitution", "yes");
                }
            }
            other => {
                doc.element(node, other.xml_name());
            }
        }
    }
}

fn write_articulations(doc: &mut XmlDocument, notations: NodeId, articulations: &[Articulation]) {
    if articulations.is_empty() {
        return;
    }
    let node = doc.element(notations, "articulations");
    for articulation in articulations {
        doc.element(node, articulation.xml_name());
    }
}

fn write_fermatas(doc: &mut XmlDocument, notations: NodeId, expressions: &[Expression]) {
    for expression in expressions {
        if let Expression::Fermata { inverted, shape } = expression {
            let node = doc.element(notations, "fermata");
            doc.set_attr(node, "type", if *inverted { "inverted" } else { "upright" });
            if let Some(shape) = shape {
                doc.set_text(node, shape);
            }
        }
    }
}

fn write_lyrics(doc: &mut XmlDocument, note: NodeId, marks: &NoteMarks) {
    for (i, lyric) in marks.lyrics.iter().enumerate() {
        let node = doc.element(note, "lyric");
        let number = lyric.number.unwrap_or(i as u32 + 1);
        doc.set_attr(node, "number", &number.to_string());
        if let Some(syllabic) = lyric.syllabic {
            doc.text_element(node, "syllabic", syllabic.xml_name());
        }
        doc.text_element(node, "text", &lyric.text);
        if lyric.extend {
            doc.element(node, "extend");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beam(kind: &str, direction: Option<BeamDirection>) -> Beam {
        Beam { kind: BeamKind::from(kind.to_string()), direction, number: None }
    }

    #[test]
    fn test_partial_beam_needs_direction() {
        assert!(validate_beams(&[beam("partial", None)]).is_err());
        assert!(validate_beams(&[beam("partial", Some(BeamDirection::Left))]).is_ok());
    }

    #[test]
    fn test_direction_on_full_beam_rejected() {
        let err = validate_beams(&[beam("start", Some(BeamDirection::Right))]).unwrap_err();
        assert!(matches!(err.kind, ExportErrorKind::InvalidBeam(_)));
    }

    #[test]
    fn test_unknown_beam_label_rejected() {
        let err = validate_beams(&[beam("sideways", None)]).unwrap_err();
        assert_eq!(
            err.kind,
            ExportErrorKind::InvalidBeam("unknown beam type 'sideways'".to_string())
        );
    }

    #[test]
    fn test_beam_values() {
        let mut doc = XmlDocument::with_root("note");
        let note = doc.root().unwrap();
        write_beams(
            &mut doc,
            note,
            &[beam("start", None), beam("partial", Some(BeamDirection::Right))],
        );
        let beams = doc.find_children(note, "beam");
        assert_eq!(doc.text(beams[0]), Some("begin"));
        assert_eq!(doc.attr(beams[0], "number"), Some("1"));
        assert_eq!(doc.text(beams[1]), Some("forward hook"));
        assert_eq!(doc.attr(beams[1], "number"), Some("2"));
    }

    #[test]
    fn test_continue_tie_doubles() {
        let mut doc = XmlDocument::with_root("note");
        let note = doc.root().unwrap();
        write_ties(&mut doc, note, Some(TieKind::Continue));
        let ties = doc.find_children(note, "tie");
        assert_eq!(ties.len(), 2);
        assert_eq!(doc.attr(ties[0], "type"), Some("stop"));
        assert_eq!(doc.attr(ties[1], "type"), Some("start"));
    }

    #[test]
    fn test_let_ring_is_tied_only() {
        let mut doc = XmlDocument::with_root("note");
        let note = doc.root().unwrap();
        write_ties(&mut doc, note, Some(TieKind::LetRing));
        assert!(doc.find_children(note, "tie").is_empty());
        write_tied(&mut doc, note, Some(TieKind::LetRing));
        let tied = doc.find_child(note, "tied").unwrap();
        assert_eq!(doc.attr(tied, "type"), Some("let-ring"));
    }
}
