//! Measure exporter
//!
//! A measure is written as: `<print>`, the start-of-measure `<attributes>`,
//! the left barline, one block per voice, the right barline.
//!
//! Blocks are the measure-level elements followed by each `Voice`. Every
//! block starts with its cursor at the measure start. Elements are visited
//! in stored order; `<forward>` or `<backup>` moves the cursor to an
//! element's offset before it is written, and a trailing `<backup>` rewinds
//! to the measure start before the next block.

use std::collections::HashSet;

use crate::models::{
    Clef, ElementId, ElementKind, KeySignature, Measure, MeasureElement, QuarterLength, TimeSignature,
};

use super::barline::{endings_for, write_barline};
use super::builder::{NodeId, XmlDocument};
use super::direction::{export_direction, export_spanner_direction, DirectionPosition};
use super::errors::ExportResult;
use super::note::{export_note_or_chord, export_rest};
use super::part::PartContext;

/// One run of elements sharing a cursor
struct Block<'m> {
    voice: Option<u32>,
    elements: &'m [MeasureElement],
}

/// Export one measure as a detached `<measure>` node
pub fn export_measure(
    doc: &mut XmlDocument,
    ctx: &mut PartContext,
    measure: &Measure,
    is_first: bool,
) -> ExportResult<NodeId> {
    write_measure(doc, ctx, measure, is_first).map_err(|e| e.at_measure(measure.number_label()))
}

fn write_measure(
    doc: &mut XmlDocument,
    ctx: &mut PartContext,
    measure: &Measure,
    is_first: bool,
) -> ExportResult<NodeId> {
    let node = doc.create_element("measure");
    doc.set_attr(node, "number", &measure.number_label());
    if measure.implicit {
        doc.set_attr(node, "implicit", "yes");
    }

    if measure.new_system || measure.new_page {
        let print = doc.element(node, "print");
        if measure.new_system {
            doc.set_attr(print, "new-system", "yes");
        }
        if measure.new_page {
            doc.set_attr(print, "new-page", "yes");
        }
    }

    let consumed = write_start_attributes(doc, node, ctx, measure, is_first);

    let (left_endings, right_endings) = endings_for(ctx, measure);
    write_barline(doc, node, "left", measure.left_barline.as_ref(), &left_endings);

    let mut blocks = Vec::new();
    let measure_level_left = measure.elements.iter().any(|e| !consumed.contains(&e.id));
    if measure_level_left || measure.voices.is_empty() {
        blocks.push(Block { voice: None, elements: &measure.elements });
    }
    for voice in &measure.voices {
        blocks.push(Block { voice: Some(voice.id), elements: &voice.elements });
    }

    let last = blocks.len().saturating_sub(1);
    for (i, block) in blocks.iter().enumerate() {
        let cursor = export_block(doc, node, ctx, block, &consumed)?;
        if i < last && cursor > 0 {
            write_backup(doc, node, cursor);
        }
    }

    write_barline(doc, node, "right", measure.right_barline.as_ref(), &right_endings);
    Ok(node)
}

/// Write the leading `<attributes>`; returns the elements it absorbed
fn write_start_attributes(
    doc: &mut XmlDocument,
    measure_node: NodeId,
    ctx: &mut PartContext,
    measure: &Measure,
    is_first: bool,
) -> HashSet<ElementId> {
    let mut consumed = HashSet::new();
    let mut key = None;
    let mut time = None;
    let mut clef = None;
    for element in measure.elements.iter().filter(|e| e.offset == QuarterLength::from_integer(0)) {
        match &element.kind {
            ElementKind::KeySignature(k) if key.is_none() => key = Some(k),
            ElementKind::TimeSignature(t) if time.is_none() => time = Some(t),
            ElementKind::Clef(c) if clef.is_none() => clef = Some(c),
            _ => continue,
        }
        consumed.insert(element.id);
    }

    let attributes = doc.create_element("attributes");
    if is_first {
        doc.text_element(attributes, "divisions", &ctx.divisions.per_quarter().to_string());
    }
    if let Some(k) = key {
        write_key(doc, attributes, k);
    }
    if let Some(t) = time {
        write_time(doc, attributes, t);
        ctx.time = Some(t.clone());
    }
    if let Some(c) = clef {
        write_clef(doc, attributes, c);
        ctx.clef = c.clone();
    } else if is_first {
        // Every staff states its clef up front
        write_clef(doc, attributes, &ctx.clef);
    }
    if is_first {
        if let Some(lines) = ctx.part.staff_lines {
            let details = doc.element(attributes, "staff-details");
            doc.text_element(details, "staff-lines", &lines.to_string());
        }
        if let Some(transpose) = ctx.transpose {
            let (diatonic, chromatic, octave_change) = transpose.normalized();
            let node = doc.element(attributes, "transpose");
            doc.text_element(node, "diatonic", &diatonic.to_string());
            doc.text_element(node, "chromatic", &chromatic.to_string());
            if octave_change != 0 {
                doc.text_element(node, "octave-change", &octave_change.to_string());
            }
        }
    }

    if !doc.children(attributes).is_empty() {
        doc.append(measure_node, attributes);
    }
    consumed
}

fn write_key(doc: &mut XmlDocument, attributes: NodeId, key: &KeySignature) {
    let node = doc.element(attributes, "key");
    doc.text_element(node, "fifths", &key.fifths.to_string());
    if let Some(mode) = key.mode {
        doc.text_element(node, "mode", mode.xml_name());
    }
}

fn write_time(doc: &mut XmlDocument, attributes: NodeId, time: &TimeSignature) {
    let node = doc.element(attributes, "time");
    if let Some(symbol) = time.symbol {
        doc.set_attr(node, "symbol", symbol.xml_name());
    }
    doc.text_element(node, "beats", &time.beats.to_string());
    doc.text_element(node, "beat-type", &time.beat_type.to_string());
}

fn write_clef(doc: &mut XmlDocument, attributes: NodeId, clef: &Clef) {
    let node = doc.element(attributes, "clef");
    doc.text_element(node, "sign", clef.sign.xml_name());
    if let Some(line) = clef.line {
        doc.text_element(node, "line", &line.to_string());
    }
    if clef.octave_change != 0 {
        doc.text_element(node, "clef-octave-change", &clef.octave_change.to_string());
    }
}

fn write_backup(doc: &mut XmlDocument, measure: NodeId, units: u64) {
    let backup = doc.element(measure, "backup");
    doc.text_element(backup, "duration", &units.to_string());
}

fn write_forward(doc: &mut XmlDocument, measure: NodeId, units: u64, voice: Option<u32>) {
    let forward = doc.element(measure, "forward");
    doc.text_element(forward, "duration", &units.to_string());
    if let Some(v) = voice {
        doc.text_element(forward, "voice", &v.to_string());
    }
}

/// Move the cursor to `target` with a forward or backup
fn seek(doc: &mut XmlDocument, measure: NodeId, cursor: &mut u64, target: u64, voice: Option<u32>) {
    if target > *cursor {
        write_forward(doc, measure, target - *cursor, voice);
    } else if target < *cursor {
        write_backup(doc, measure, *cursor - target);
    }
    *cursor = target;
}

/// Units an element advances the cursor by
fn advance_units(ctx: &PartContext, element: &MeasureElement) -> ExportResult<u64> {
    match element.duration() {
        Some(duration) if !element.is_grace() => ctx.units(duration.quarter_length),
        _ => Ok(0),
    }
}

/// Export one block; returns the cursor position at its end
fn export_block(
    doc: &mut XmlDocument,
    measure: NodeId,
    ctx: &mut PartContext,
    block: &Block,
    consumed: &HashSet<ElementId>,
) -> ExportResult<u64> {
    let mut content_end = 0u64;
    for element in block.elements.iter().filter(|e| e.duration().is_some()) {
        content_end = content_end.max(ctx.units(element.offset)? + advance_units(ctx, element)?);
    }

    let mut cursor = 0u64;
    for element in block.elements {
        if consumed.contains(&element.id) {
            continue;
        }
        if matches!(element.kind, ElementKind::LayoutHint) {
            crate::musicxml_log!("skipping layout hint {} in measure {}", element.id, doc.attr(measure, "number").unwrap_or("?"));
            continue;
        }

        let offset = ctx.units(element.offset)?;
        if element.kind.is_direction_like() && offset >= content_end {
            let position = DirectionPosition { offset: Some(offset - cursor.min(offset)), voice: block.voice };
            export_direction(doc, measure, &element.kind, position);
            continue;
        }
        seek(doc, measure, &mut cursor, offset, block.voice);

        match &element.kind {
            ElementKind::Chord(chord) if chord.tones.is_empty() => {
                let units = advance_units(ctx, element)?;
                if units > 0 {
                    write_forward(doc, measure, units, block.voice);
                }
                cursor += units;
            }
            ElementKind::Note(_) | ElementKind::Unpitched(_) | ElementKind::Chord(_) => {
                write_spanner_directions(doc, measure, ctx, element.id, true, block.voice);
                export_note_or_chord(doc, measure, ctx, element, block.voice)?;
                cursor += advance_units(ctx, element)?;
                write_spanner_directions(doc, measure, ctx, element.id, false, block.voice);
            }
            ElementKind::Rest(rest) => {
                write_spanner_directions(doc, measure, ctx, element.id, true, block.voice);
                export_rest(doc, measure, ctx, element, rest, block.voice)?;
                cursor += advance_units(ctx, element)?;
                write_spanner_directions(doc, measure, ctx, element.id, false, block.voice);
            }
            ElementKind::Clef(clef) => {
                let attributes = doc.element(measure, "attributes");
                write_clef(doc, attributes, clef);
                ctx.clef = clef.clone();
            }
            ElementKind::KeySignature(key) => {
                let attributes = doc.element(measure, "attributes");
                write_key(doc, attributes, key);
            }
            ElementKind::TimeSignature(time) => {
                let attributes = doc.element(measure, "attributes");
                write_time(doc, attributes, time);
                ctx.time = Some(time.clone());
            }
            ElementKind::Barline(barline) => {
                write_barline(doc, measure, "middle", Some(barline), &[]);
            }
            kind => {
                let position = DirectionPosition { offset: None, voice: block.voice };
                export_direction(doc, measure, kind, position);
            }
        }
    }
    Ok(cursor)
}

/// Start directions go before the first member, stop directions after the last
fn write_spanner_directions(
    doc: &mut XmlDocument,
    measure: NodeId,
    ctx: &mut PartContext,
    id: ElementId,
    start: bool,
    voice: Option<u32>,
) {
    let selected = ctx.spanners.select(id, |k| k.is_direction());
    for (membership, spanner) in selected {
        let wanted = if start { membership.is_first } else { membership.is_last };
        if wanted {
            export_spanner_direction(doc, measure, ctx, membership, spanner, start, voice);
        }
    }
}
