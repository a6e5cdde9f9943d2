//! Part-staff joining
//!
//! A piano or organ arrives as one part per staff. After every part has been
//! exported on its own, each joinable staff group is folded into its first
//! part: staves are tagged with `<staff>`, the other staves' measures are
//! moved into the first part's measures after a `<backup>`, and the first
//! measure's attributes announce `<staves>`.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{GroupSymbol, Score};

use super::builder::{NodeId, XmlDocument};
use super::errors::{ExportError, ExportErrorKind, ExportResult};
use super::helpers::MeasureNumber;
use super::part::ExportedPart;

/// Note children that follow `<staff>`
const NOTE_AFTER_STAFF: &[&str] = &["beam", "notations", "lyric", "play", "listen"];
/// Direction children that follow `<staff>`
const DIRECTION_AFTER_STAFF: &[&str] = &["sound", "listen"];
/// Note children that follow `<voice>`
const NOTE_AFTER_VOICE: &[&str] = &[
    "type", "dot", "accidental", "time-modification", "stem", "notehead", "staff", "beam", "notations", "lyric",
];
const ATTRIBUTES_AFTER_STAVES: &[&str] = &[
    "part-symbol", "instruments", "clef", "staff-details", "transpose", "directive", "measure-style",
];
const ATTRIBUTES_AFTER_PART_SYMBOL: &[&str] =
    &["instruments", "clef", "staff-details", "transpose", "directive", "measure-style"];
const ATTRIBUTES_AFTER_CLEF: &[&str] = &["staff-details", "transpose", "directive", "measure-style"];

/// A staff group whose parts are exported as one multi-staff part
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroup {
    /// Index into `Score::staff_groups`
    pub group: usize,
    /// Score part indices, top staff first
    pub parts: Vec<usize>,
    pub symbol: Option<GroupSymbol>,
}

/// Staff groups that qualify for joining
///
/// A group qualifies when it has more than one member and every member is
/// flagged `part_staff`. A part already claimed by an earlier group stays
/// where it is.
pub fn joinable_groups(score: &Score) -> Vec<JoinGroup> {
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut joins = Vec::new();

    for (index, group) in score.staff_groups.iter().enumerate() {
        if group.parts.len() < 2 {
            continue;
        }
        let all_staves = group
            .parts
            .iter()
            .all(|i| score.parts.get(*i).map_or(true, |part| part.part_staff));
        if !all_staves {
            continue;
        }
        if group.parts.iter().any(|i| claimed.contains(i)) {
            crate::musicxml_log!("staff group {} overlaps an earlier joined group, not joining", index);
            continue;
        }
        claimed.extend(group.parts.iter().copied());
        joins.push(JoinGroup {
            group: index,
            parts: group.parts.clone(),
            symbol: group.symbol,
        });
    }
    joins
}

pub struct PartStaffMerger<'a> {
    score: &'a Score,
}

impl<'a> PartStaffMerger<'a> {
    pub fn new(score: &'a Score) -> Self {
        Self { score }
    }

    /// Fold every join group into its first part and drop the merged-away parts
    pub fn merge(
        &self,
        doc: &mut XmlDocument,
        exported: &mut Vec<ExportedPart>,
        joins: &[JoinGroup],
    ) -> ExportResult<()> {
        let mut removed: HashSet<usize> = HashSet::new();

        for join in joins {
            let mut positions = Vec::with_capacity(join.parts.len());
            for index in &join.parts {
                let position = exported
                    .iter()
                    .position(|p| p.score_index == *index)
                    .ok_or_else(|| ExportError::new(ExportErrorKind::MissingPartStaffMapping(*index)))?;
                positions.push(position);
            }
            let Some(&target_position) = positions.first() else {
                continue;
            };
            let target = exported[target_position].node;
            let target_name = self.part_name(&exported[target_position]);

            crate::musicxml_log!("joining {} staves into part '{}'", positions.len(), target_name);

            for (k, position) in positions.iter().enumerate() {
                let staff = k + 1;
                tag_staff(doc, exported[*position].node, staff)
                    .map_err(|e| e.on_staff(staff).in_part(self.part_name(&exported[*position])))?;
            }

            for (k, position) in positions.iter().enumerate().skip(1) {
                let staff = k + 1;
                move_measures(doc, target, exported[*position].node, staff)
                    .map_err(|e| e.on_staff(staff).in_part(&target_name))?;
                removed.insert(*position);
            }

            unify_attributes(doc, target, positions.len(), join.symbol).map_err(|e| e.in_part(&target_name))?;
        }

        let mut position = 0;
        exported.retain(|_| {
            let keep = !removed.contains(&position);
            position += 1;
            keep
        });
        Ok(())
    }

    fn part_name(&self, part: &ExportedPart) -> String {
        self.score
            .parts
            .get(part.score_index)
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| part.id.clone())
    }
}

fn measure_label(doc: &XmlDocument, measure: NodeId) -> String {
    doc.attr(measure, "number").unwrap_or_default().to_string()
}

fn duration_of(doc: &XmlDocument, node: NodeId) -> i64 {
    doc.child_text(node, "duration")
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(0)
}

fn voice_of(doc: &XmlDocument, node: NodeId) -> Option<u32> {
    doc.child_text(node, "voice").and_then(|text| text.trim().parse().ok())
}

/// Insert `<staff>k</staff>` into every note, direction, forward, and harmony of a part
fn tag_staff(doc: &mut XmlDocument, part: NodeId, staff: usize) -> ExportResult<()> {
    let staff_text = staff.to_string();
    for measure in doc.find_children(part, "measure") {
        for child in doc.children(measure).to_vec() {
            let (tag, before) = match doc.tag(child) {
                Some("note") => ("note", NOTE_AFTER_STAFF),
                Some("direction") => ("direction", DIRECTION_AFTER_STAFF),
                Some("forward") => ("forward", &[][..]),
                Some("harmony") => ("harmony", &[][..]),
                _ => continue,
            };
            if doc.find_child(child, "staff").is_some() {
                return Err(ExportError::new(ExportErrorKind::StaffTagCollision(tag.to_string()))
                    .at_measure(measure_label(doc, measure)));
            }
            let node = doc.create_element("staff");
            doc.set_text(node, &staff_text);
            doc.insert_before_first_of(child, node, before);
        }
    }
    Ok(())
}

/// Move every measure of `source` into the matching measure of `target`
///
/// Measures are matched by number. A source measure with no counterpart gets
/// a fresh target measure, placed where the number order puts it.
fn move_measures(doc: &mut XmlDocument, target: NodeId, source: NodeId, staff: usize) -> ExportResult<()> {
    let target_measures = doc.find_children(target, "measure");
    let mut cursor = 0;

    for src in doc.find_children(source, "measure") {
        let label = measure_label(doc, src);
        let number = MeasureNumber::parse(&label);

        loop {
            let Some(&dest) = target_measures.get(cursor) else {
                let dest = insert_measure(doc, target, src, staff, None);
                merge_one_measure(doc, dest, src, staff).map_err(|e| e.at_measure(&label))?;
                break;
            };
            match MeasureNumber::parse(&measure_label(doc, dest)).cmp(&number) {
                Ordering::Equal => {
                    merge_one_measure(doc, dest, src, staff).map_err(|e| e.at_measure(&label))?;
                    cursor += 1;
                    break;
                }
                Ordering::Less => cursor += 1,
                Ordering::Greater => {
                    let inserted = insert_measure(doc, target, src, staff, Some(dest));
                    merge_one_measure(doc, inserted, src, staff).map_err(|e| e.at_measure(&label))?;
                    break;
                }
            }
        }
    }
    Ok(())
}

/// New empty target measure numbered like `src`, before `before` or at the end
fn insert_measure(
    doc: &mut XmlDocument,
    target: NodeId,
    src: NodeId,
    staff: usize,
    before: Option<NodeId>,
) -> NodeId {
    let label = measure_label(doc, src);
    crate::musicxml_log!("measure {} exists only on staff {}, adding it", label, staff);

    let comment = doc.create_comment(&format!("measure {} from staff {}", label, staff));
    let measure = doc.create_element("measure");
    doc.set_attr(measure, "number", &label);
    if let Some(implicit) = doc.attr(src, "implicit").map(str::to_string) {
        doc.set_attr(measure, "implicit", &implicit);
    }

    match before.and_then(|b| doc.index_of(target, b)) {
        Some(index) => {
            doc.insert_at(target, index, comment);
            doc.insert_at(target, index + 1, measure);
        }
        None => {
            doc.append(target, comment);
            doc.append(target, measure);
        }
    }
    measure
}

/// Append the content of `src` (staff `staff`) to `dest`
fn merge_one_measure(doc: &mut XmlDocument, dest: NodeId, src: NodeId, staff: usize) -> ExportResult<()> {
    for note in doc.find_children(dest, "note") {
        if doc.find_child(note, "voice").is_none() {
            let voice = doc.create_element("voice");
            doc.set_text(voice, "1");
            doc.insert_before_first_of(note, voice, NOTE_AFTER_VOICE);
        }
    }

    let mut max_voice = 0;
    let mut net: i64 = 0;
    let mut right_barline = None;
    for child in doc.children(dest).to_vec() {
        match doc.tag(child) {
            Some("note") => {
                max_voice = max_voice.max(voice_of(doc, child).unwrap_or(1));
                let chord = doc.find_child(child, "chord").is_some();
                let grace = doc.find_child(child, "grace").is_some();
                if !chord && !grace {
                    net += duration_of(doc, child);
                }
            }
            Some("forward") => {
                max_voice = max_voice.max(voice_of(doc, child).unwrap_or(0));
                net += duration_of(doc, child);
            }
            Some("backup") => net -= duration_of(doc, child),
            Some("barline") if doc.attr(child, "location").unwrap_or("right") == "right" => {
                doc.detach(child);
                right_barline = Some(child);
            }
            _ => {}
        }
    }

    if net > 0 {
        let backup = doc.element(dest, "backup");
        doc.text_element(backup, "duration", &net.to_string());
    }

    let staff_number = staff.to_string();
    let src_children = doc.children(src).to_vec();
    let earliest = doc.find_child(src, "attributes");

    for child in src_children {
        let Some(tag) = doc.tag(child).map(str::to_string) else {
            doc.append(dest, child);
            continue;
        };
        match tag.as_str() {
            "print" => {}
            "attributes" if Some(child) == earliest => {
                move_start_clefs(doc, dest, child, &staff_number);
            }
            "attributes" => {
                for duplicate in ["divisions", "key", "time"] {
                    for node in doc.find_children(child, duplicate) {
                        doc.detach(node);
                    }
                }
                for clef in doc.find_children(child, "clef") {
                    doc.set_attr(clef, "number", &staff_number);
                }
                if !doc.children(child).is_empty() {
                    doc.append(dest, child);
                }
            }
            "barline" => match doc.attr(child, "location").unwrap_or("right") {
                "right" => right_barline = Some(child),
                "left" => replace_left_barline(doc, dest, child),
                _ => doc.append(dest, child),
            },
            "note" | "forward" | "direction" => {
                offset_voice(doc, child, &tag, max_voice);
                doc.append(dest, child);
            }
            _ => doc.append(dest, child),
        }
    }

    if let Some(barline) = right_barline {
        doc.append(dest, barline);
    }
    Ok(())
}

/// Clefs from the source's leading attributes join the destination's leading attributes
fn move_start_clefs(doc: &mut XmlDocument, dest: NodeId, attributes: NodeId, staff_number: &str) {
    let clefs = doc.find_children(attributes, "clef");
    if clefs.is_empty() {
        return;
    }
    let dest_attributes = match doc.find_child(dest, "attributes") {
        Some(node) => node,
        None => {
            let node = doc.create_element("attributes");
            let index = doc
                .children(dest)
                .iter()
                .position(|&c| !doc.is_element(c, "print"))
                .unwrap_or(doc.children(dest).len());
            doc.insert_at(dest, index, node);
            node
        }
    };
    for clef in clefs {
        doc.set_attr(clef, "number", staff_number);
        doc.insert_before_first_of(dest_attributes, clef, ATTRIBUTES_AFTER_CLEF);
    }
}

fn replace_left_barline(doc: &mut XmlDocument, dest: NodeId, barline: NodeId) {
    let existing = doc
        .find_children(dest, "barline")
        .into_iter()
        .find(|&b| doc.attr(b, "location") == Some("left"));
    match existing.and_then(|old| doc.index_of(dest, old).map(|index| (old, index))) {
        Some((old, index)) => {
            doc.detach(old);
            doc.insert_at(dest, index, barline);
        }
        None => {
            let index = doc
                .children(dest)
                .iter()
                .position(|&c| !doc.is_element(c, "print") && !doc.is_element(c, "attributes"))
                .unwrap_or(doc.children(dest).len());
            doc.insert_at(dest, index, barline);
        }
    }
}

/// Shift a moved element's voice past the destination's voices
fn offset_voice(doc: &mut XmlDocument, node: NodeId, tag: &str, max_voice: u32) {
    match doc.find_child(node, "voice") {
        Some(voice) => {
            let current = doc.text(voice).and_then(|t| t.trim().parse::<u32>().ok()).unwrap_or(1);
            doc.set_text(voice, &(current + max_voice).to_string());
        }
        None if tag == "note" => {
            let voice = doc.create_element("voice");
            doc.set_text(voice, &(1 + max_voice).to_string());
            doc.insert_before_first_of(node, voice, NOTE_AFTER_VOICE);
        }
        None if tag == "forward" => {
            let voice = doc.create_element("voice");
            doc.set_text(voice, &(1 + max_voice).to_string());
            doc.insert_before_first_of(node, voice, &["staff"]);
        }
        None => {}
    }
}

/// Announce the staff count in the first measure and number its clefs
fn unify_attributes(
    doc: &mut XmlDocument,
    target: NodeId,
    staves: usize,
    symbol: Option<GroupSymbol>,
) -> ExportResult<()> {
    let Some(first) = doc.find_child(target, "measure") else {
        return Ok(());
    };
    let attributes = match doc.find_child(first, "attributes") {
        Some(node) => node,
        None => {
            let node = doc.create_element("attributes");
            doc.insert_at(first, 0, node);
            node
        }
    };

    let staves_node = doc.create_element("staves");
    doc.set_text(staves_node, &staves.to_string());
    doc.insert_before_first_of(attributes, staves_node, ATTRIBUTES_AFTER_STAVES);

    if let Some(symbol) = symbol {
        let node = doc.create_element("part-symbol");
        doc.set_text(node, symbol.xml_name());
        doc.insert_before_first_of(attributes, node, ATTRIBUTES_AFTER_PART_SYMBOL);
    }

    let clefs = doc.find_children(attributes, "clef");
    for &clef in &clefs {
        if doc.attr(clef, "number").is_none() {
            doc.set_attr(clef, "number", "1");
        }
    }
    if clefs.len() > staves {
        return Err(ExportError::new(ExportErrorKind::ClefCountExceeded { clefs: clefs.len(), staves })
            .at_measure(measure_label(doc, first)));
    }
    Ok(())
}
