// Joining part-staffs into one multi-staff part

mod common;

use common::*;
use musicxml_export::config::ExportConfig;
use musicxml_export::models::{
    Clef, ElementKind, GroupSymbol, MeasureElement, Part, Score, Spanner, SpannerKind, StaffGroup, Step, Voice,
};
use musicxml_export::renderers::musicxml::{to_musicxml, ExportErrorKind};

fn piano(right: Part, left: Part) -> Score {
    let right = Part { name: Some("Piano".into()), part_staff: true, ..right };
    let left = Part { name: Some("Piano".into()), part_staff: true, ..left };
    Score {
        parts: vec![right, left],
        staff_groups: vec![StaffGroup {
            parts: vec![0, 1],
            name: Some("Piano".into()),
            symbol: Some(GroupSymbol::Brace),
            barline: true,
            ..StaffGroup::default()
        }],
        ..Score::default()
    }
}

fn with_bass_clef(mut part: Part, ids: &mut Ids) -> Part {
    if let Some(first) = part.measures.first_mut() {
        first
            .elements
            .insert(0, MeasureElement::new(ids.next(), ql(0, 1), ElementKind::Clef(Clef::bass())));
    }
    part
}

/// Walk a measure and check that no backup rewinds past the measure start
/// and that every block ends within the bar
fn assert_cursor_balanced(measure: roxmltree::Node, bar: i64) {
    let mut cursor: i64 = 0;
    for child in measure.children().filter(|c| c.is_element()) {
        let duration: i64 = child_text(child, "duration").and_then(|d| d.parse().ok()).unwrap_or(0);
        match child.tag_name().name() {
            "note" => {
                let chord = !children(child, "chord").is_empty();
                let grace = !children(child, "grace").is_empty();
                if !chord && !grace {
                    cursor += duration;
                }
            }
            "forward" => cursor += duration,
            "backup" => cursor -= duration,
            _ => {}
        }
        assert!(cursor >= 0, "measure {:?} rewinds past its start", measure.attribute("number"));
        assert!(cursor <= bar, "measure {:?} runs past the bar", measure.attribute("number"));
    }
}

#[test]
fn test_staves_are_joined_and_tagged() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1, 2], Step::E, 5);
    let left = with_bass_clef(whole_note_part(&mut ids, &[1, 2], Step::C, 3), &mut ids);
    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);

    let parts: Vec<_> = doc.descendants().filter(|n| n.has_tag_name("part")).collect();
    assert_eq!(parts.len(), 1, "the left hand is folded into the right hand");
    let score_parts: Vec<_> = doc.descendants().filter(|n| n.has_tag_name("score-part")).collect();
    assert_eq!(score_parts.len(), 1);
    assert!(
        !doc.descendants().any(|n| n.has_tag_name("part-group")),
        "a joined group becomes a part-symbol, not a part-group"
    );

    let first = children(parts[0], "measure")[0];
    let attributes = children(first, "attributes")[0];
    assert_eq!(child_text(attributes, "staves"), Some("2"));
    assert_eq!(child_text(attributes, "part-symbol"), Some("brace"));
    let clefs: Vec<_> = children(attributes, "clef")
        .iter()
        .map(|c| (c.attribute("number"), child_text(*c, "sign")))
        .collect();
    assert_eq!(clefs, vec![(Some("1"), Some("G")), (Some("2"), Some("F"))]);

    for measure in children(parts[0], "measure") {
        let notes = children(measure, "note");
        assert_eq!(notes.len(), 2);
        assert_eq!(child_text(notes[0], "staff"), Some("1"));
        assert_eq!(child_text(notes[0], "voice"), Some("1"));
        assert_eq!(child_text(notes[1], "staff"), Some("2"));
        assert_eq!(child_text(notes[1], "voice"), Some("2"));
        let backup = children(measure, "backup")[0];
        assert_eq!(child_text(backup, "duration"), Some("4"));
        assert_cursor_balanced(measure, 4);
    }
}

#[test]
fn test_measure_number_gap() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1, 2, 3, 4], Step::E, 5);
    let left = whole_note_part(&mut ids, &[2, 4], Step::C, 3);
    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);

    let part = doc.descendants().find(|n| n.has_tag_name("part")).unwrap();
    let measures = children(part, "measure");
    let numbers: Vec<_> = measures.iter().map(|m| m.attribute("number")).collect();
    assert_eq!(numbers, vec![Some("1"), Some("2"), Some("3"), Some("4")]);

    let staff_counts: Vec<usize> = measures
        .iter()
        .map(|m| {
            children(*m, "note")
                .iter()
                .filter(|n| child_text(**n, "staff") == Some("2"))
                .count()
        })
        .collect();
    assert_eq!(staff_counts, vec![0, 1, 0, 1]);
    for measure in &measures {
        assert_cursor_balanced(*measure, 4);
    }
}

#[test]
fn test_lower_staff_measure_missing_from_upper() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1, 3], Step::E, 5);
    let left = whole_note_part(&mut ids, &[1, 2, 3], Step::C, 3);
    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);

    let part = doc.descendants().find(|n| n.has_tag_name("part")).unwrap();
    let numbers: Vec<_> = children(part, "measure").iter().map(|m| m.attribute("number")).collect();
    assert_eq!(numbers, vec![Some("1"), Some("2"), Some("3")]);
    assert!(part.children().any(|c| c.is_comment()), "inserted measures are annotated");
}

#[test]
fn test_voices_are_offset_past_upper_staff() {
    let mut ids = Ids::new();
    let mut right = whole_note_part(&mut ids, &[1], Step::E, 5);
    let measure = &mut right.measures[0];
    let upper = measure.elements.remove(0);
    measure.voices.push(Voice { id: 1, elements: vec![upper] });
    measure.voices.push(Voice { id: 2, elements: vec![rest(&mut ids, ql(0, 1), ql(4, 1))] });
    let left = whole_note_part(&mut ids, &[1], Step::C, 3);

    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);
    let measure = doc.descendants().find(|n| n.has_tag_name("measure")).unwrap();
    let voices: Vec<_> = children(measure, "note").iter().map(|n| child_text(*n, "voice")).collect();
    assert_eq!(voices, vec![Some("1"), Some("2"), Some("3")]);
    assert_cursor_balanced(measure, 4);
}

#[test]
fn test_join_can_be_disabled() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1], Step::E, 5);
    let left = whole_note_part(&mut ids, &[1], Step::C, 3);
    let mut config = ExportConfig::default();
    config.export.join_part_staffs = false;

    let xml = to_musicxml(&piano(right, left), &config).unwrap();
    let doc = parse(&xml);
    assert_eq!(doc.descendants().filter(|n| n.has_tag_name("part")).count(), 2);
    let groups: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("part-group"))
        .map(|g| (g.attribute("type"), g.attribute("number")))
        .collect();
    assert_eq!(groups, vec![(Some("start"), Some("1")), (Some("stop"), Some("1"))]);
    assert!(!xml.contains("<staff>"));
}

#[test]
fn test_group_naming_missing_part_fails() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1], Step::E, 5);
    let left = whole_note_part(&mut ids, &[1], Step::C, 3);
    let mut score = piano(right, left);
    score.staff_groups[0].parts = vec![0, 5];

    let err = to_musicxml(&score, &ExportConfig::default()).unwrap_err();
    assert_eq!(err.kind, ExportErrorKind::MissingPartStaffMapping(5));
}

#[test]
fn test_joined_parts_share_divisions() {
    let mut ids = Ids::new();
    let right = whole_note_part(&mut ids, &[1], Step::E, 5);
    let mut left = whole_note_part(&mut ids, &[1], Step::C, 3);
    left.measures[0].elements = vec![
        note(&mut ids, ql(0, 1), Step::C, 3, ql(3, 2)),
        note(&mut ids, ql(3, 2), Step::G, 2, ql(5, 2)),
    ];

    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);
    let divisions: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("divisions"))
        .map(|n| n.text())
        .collect();
    assert_eq!(divisions, vec![Some("2")]);
    let measure = doc.descendants().find(|n| n.has_tag_name("measure")).unwrap();
    let backup = children(measure, "backup")[0];
    assert_eq!(child_text(backup, "duration"), Some("8"));
    assert_cursor_balanced(measure, 8);
}

/// Slur from the note of the first measure to the note of the last one
fn with_slur_across(mut part: Part) -> Part {
    let members = part.measures.iter().filter_map(|m| m.elements.first().map(|e| e.id)).collect();
    part.spanners.push(Spanner { kind: SpannerKind::Slur { placement: None }, members });
    part
}

/// `(staff, number)` of every slur marker of one type, in document order
fn slur_ends<'a>(doc: &'a roxmltree::Document<'_>, kind: &str) -> Vec<(Option<&'a str>, Option<&'a str>)> {
    doc.descendants()
        .filter(|n| n.has_tag_name("slur") && n.attribute("type") == Some(kind))
        .filter_map(|slur| {
            let note = slur.ancestors().find(|a| a.has_tag_name("note"))?;
            Some((child_text(note, "staff"), slur.attribute("number")))
        })
        .collect()
}

#[test]
fn test_joined_staves_keep_slur_numbers_apart() {
    let mut ids = Ids::new();
    let right = with_slur_across(whole_note_part(&mut ids, &[1, 2], Step::E, 5));
    let left = with_slur_across(whole_note_part(&mut ids, &[1, 2], Step::C, 3));
    let xml = to_musicxml(&piano(right, left), &ExportConfig::default()).unwrap();
    let doc = parse(&xml);

    assert_eq!(slur_ends(&doc, "start"), vec![(Some("1"), Some("1")), (Some("2"), Some("2"))]);
    assert_eq!(slur_ends(&doc, "stop"), vec![(Some("1"), Some("1")), (Some("2"), Some("2"))]);
}
