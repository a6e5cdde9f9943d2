//! MusicXML score converter
//!
//! Main entry point for converting a `Score` to MusicXML 3.1 partwise.
//! Parts are exported detached, joined part-staffs are merged, and only then
//! are the part-list and the parts attached to `<score-partwise>`.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ExportConfig;
use crate::models::{
    Clef, Duration, ElementKind, KeySignature, Measure, MeasureElement, Part, QuarterLength, Rest, Score,
    ScoreMetadata, StaffGroup, TimeSignature,
};

use super::builder::{NodeId, XmlDocument};
use super::duration::Divisions;
use super::errors::{ExportError, ExportResult};
use super::helpers::{format_decimal, LOG_TARGET};
use super::part::{part_divisions, ExportedPart, PartExporter};
use super::part_staff::{joinable_groups, JoinGroup, PartStaffMerger};
use super::spanners::NumberFloor;

pub const MUSICXML_DOCTYPE: &str = r#"score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd""#;

const PERCUSSION_CHANNEL: u8 = 10;

/// XML NCName, the shape MusicXML requires of part ids
static NCNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").ok());

/// MIDI channels handed out across the whole score
#[derive(Debug, Default)]
pub struct MidiChannelPool {
    used: BTreeSet<u8>,
    wrapped: u8,
}

impl MidiChannelPool {
    /// Lowest free channel; percussion always gets channel 10
    pub fn allocate(&mut self, percussion: bool) -> u8 {
        if percussion {
            self.used.insert(PERCUSSION_CHANNEL);
            return PERCUSSION_CHANNEL;
        }
        if let Some(channel) = (1..=16u8).find(|c| *c != PERCUSSION_CHANNEL && !self.used.contains(c)) {
            self.used.insert(channel);
            return channel;
        }
        // Pool exhausted; cycle through the melodic channels again
        let channel = (1..=16u8)
            .filter(|c| *c != PERCUSSION_CHANNEL)
            .nth(usize::from(self.wrapped % 15))
            .unwrap_or(1);
        self.wrapped = self.wrapped.wrapping_add(1);
        log::warn!(target: LOG_TARGET, "MIDI channels exhausted, reusing channel {}", channel);
        channel
    }

    /// Mark an explicitly requested channel as taken
    pub fn reserve(&mut self, channel: u8) {
        self.used.insert(channel);
    }
}

/// Unique `<score-part id>` values
#[derive(Debug, Default)]
pub struct PartIdRegistry {
    used: HashSet<String>,
    counter: usize,
}

impl PartIdRegistry {
    /// Keep the model id when it is a valid, unused NCName; otherwise the next free `P<n>`
    pub fn assign(&mut self, requested: Option<&str>) -> String {
        if let Some(id) = requested {
            let valid = NCNAME_RE.as_ref().map_or(false, |re| re.is_match(id));
            if valid && !self.used.contains(id) {
                self.used.insert(id.to_string());
                return id.to_string();
            }
            crate::musicxml_log!("part id '{}' is invalid or taken, generating one", id);
        }
        loop {
            self.counter += 1;
            let id = format!("P{}", self.counter);
            if self.used.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// State shared by every part of one export
#[derive(Debug, Default)]
pub struct ScoreContext {
    pub channels: MidiChannelPool,
    pub part_ids: PartIdRegistry,
}

impl ScoreContext {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct ScoreExporter<'a> {
    score: &'a Score,
    config: &'a ExportConfig,
}

impl<'a> ScoreExporter<'a> {
    pub fn new(score: &'a Score, config: &'a ExportConfig) -> Self {
        Self { score, config }
    }

    /// Build the whole `<score-partwise>` document
    pub fn export(&self) -> ExportResult<XmlDocument> {
        if self.score.is_empty() {
            crate::musicxml_log!("Empty score, generating a single measure with a whole rest");
            let placeholder = placeholder_score(&self.score.metadata, self.config);
            return ScoreExporter::new(&placeholder, self.config).export();
        }

        crate::musicxml_log!("Starting MusicXML export for score with {} parts", self.score.parts.len());

        let mut doc = XmlDocument::new();
        let root = doc.create_element("score-partwise");
        doc.set_root(root);
        doc.set_doctype(MUSICXML_DOCTYPE);
        doc.set_attr(root, "version", &self.config.encoding.musicxml_version);

        self.write_header(&mut doc, root);

        let joins = if self.config.export.join_part_staffs {
            joinable_groups(self.score)
        } else {
            Vec::new()
        };
        let shared_divisions = self.shared_divisions(&joins)?;

        let join_of: HashMap<usize, usize> = joins
            .iter()
            .enumerate()
            .flat_map(|(j, join)| join.parts.iter().map(move |p| (*p, j)))
            .collect();
        let mut join_floors: HashMap<usize, NumberFloor> = HashMap::new();

        let mut score_ctx = ScoreContext::new();
        let mut exported = Vec::with_capacity(self.score.parts.len());
        for (index, part) in self.score.parts.iter().enumerate() {
            let mut exporter = PartExporter::new(part, index, self.config);
            if let Some(divisions) = shared_divisions.get(&index) {
                exporter = exporter.with_divisions(*divisions);
            }
            let join = join_of.get(&index).copied();
            if let Some(floor) = join.and_then(|j| join_floors.get(&j)) {
                exporter = exporter.with_number_floor(floor.clone());
            }
            let part = exporter.export(&mut doc, &mut score_ctx)?;
            if let Some(j) = join {
                join_floors.insert(j, part.spanner_peak.clone());
            }
            exported.push(part);
        }

        PartStaffMerger::new(self.score).merge(&mut doc, &mut exported, &joins)?;

        self.write_part_list(&mut doc, root, &exported, &joins);
        for part in &exported {
            doc.append(root, part.node);
        }

        crate::musicxml_log!("MusicXML export complete: {} parts written", exported.len());
        Ok(doc)
    }

    /// Joined staves must share one divisions value
    fn shared_divisions(&self, joins: &[JoinGroup]) -> ExportResult<HashMap<usize, Divisions>> {
        let mut shared = HashMap::new();
        for join in joins {
            let mut per_part = Vec::new();
            for part in join.parts.iter().filter_map(|i| self.score.parts.get(*i)) {
                per_part.push(part_divisions(part)?);
            }
            let divisions = Divisions::unify(per_part).map_err(ExportError::new)?;
            for index in &join.parts {
                shared.insert(*index, divisions);
            }
        }
        Ok(shared)
    }

    fn write_header(&self, doc: &mut XmlDocument, root: NodeId) {
        let metadata = &self.score.metadata;

        if metadata.work_title.is_some() || metadata.work_number.is_some() {
            let work = doc.element(root, "work");
            if let Some(number) = &metadata.work_number {
                doc.text_element(work, "work-number", number);
            }
            if let Some(title) = &metadata.work_title {
                doc.text_element(work, "work-title", title);
            }
        }
        if let Some(number) = &metadata.movement_number {
            doc.text_element(root, "movement-number", number);
        }
        if let Some(title) = &metadata.movement_title {
            doc.text_element(root, "movement-title", title);
        }

        let identification = doc.element(root, "identification");
        for (kind, name) in [
            ("composer", &metadata.composer),
            ("lyricist", &metadata.lyricist),
            ("arranger", &metadata.arranger),
        ] {
            if let Some(name) = name {
                let creator = doc.text_element(identification, "creator", name);
                doc.set_attr(creator, "type", kind);
            }
        }
        if let Some(rights) = &metadata.rights {
            doc.text_element(identification, "rights", rights);
        }
        let encoding = doc.element(identification, "encoding");
        if let Some(date) = self.config.resolved_encoding_date() {
            doc.text_element(encoding, "encoding-date", &date);
        }
        doc.text_element(encoding, "software", &self.config.encoding.software);
        for element in ["accidental", "beam", "stem"] {
            doc.empty_element(encoding, "supports", &[("element", element), ("type", "yes")]);
        }

        self.write_defaults(doc, root);
    }

    fn write_defaults(&self, doc: &mut XmlDocument, root: NodeId) {
        let layout = &self.config.layout;
        let defaults = doc.element(root, "defaults");
        let scaling = doc.element(defaults, "scaling");
        doc.text_element(scaling, "millimeters", &format_decimal(layout.scaling.millimeters));
        doc.text_element(scaling, "tenths", &format_decimal(layout.scaling.tenths));

        if let Some(page) = &layout.page {
            let page_layout = doc.element(defaults, "page-layout");
            doc.text_element(page_layout, "page-height", &format_decimal(page.height));
            doc.text_element(page_layout, "page-width", &format_decimal(page.width));
            let margins = doc.element(page_layout, "page-margins");
            doc.set_attr(margins, "type", "both");
            doc.text_element(margins, "left-margin", &format_decimal(page.left_margin));
            doc.text_element(margins, "right-margin", &format_decimal(page.right_margin));
            doc.text_element(margins, "top-margin", &format_decimal(page.top_margin));
            doc.text_element(margins, "bottom-margin", &format_decimal(page.bottom_margin));
        }
        if let Some(system) = &layout.system {
            let system_layout = doc.element(defaults, "system-layout");
            let margins = doc.element(system_layout, "system-margins");
            doc.text_element(margins, "left-margin", &format_decimal(system.left_margin));
            doc.text_element(margins, "right-margin", &format_decimal(system.right_margin));
            doc.text_element(system_layout, "system-distance", &format_decimal(system.system_distance));
            doc.text_element(system_layout, "top-system-distance", &format_decimal(system.top_system_distance));
        }
    }

    /// `<part-list>` with nested part-groups around the surviving parts
    fn write_part_list(&self, doc: &mut XmlDocument, root: NodeId, parts: &[ExportedPart], joins: &[JoinGroup]) {
        let part_list = doc.element(root, "part-list");

        let position: HashMap<usize, usize> = parts
            .iter()
            .enumerate()
            .map(|(pos, part)| (part.score_index, pos))
            .collect();
        let joined: HashSet<usize> = joins.iter().map(|j| j.group).collect();

        // (group index, first position, last position)
        let mut spans = Vec::new();
        for (index, group) in self.score.staff_groups.iter().enumerate() {
            if joined.contains(&index) {
                continue;
            }
            let mut members = Vec::new();
            for member in &group.parts {
                match position.get(member) {
                    Some(pos) => members.push(*pos),
                    None if *member >= self.score.parts.len() => {
                        log::warn!(target: LOG_TARGET, "staff group {} names missing part {}", index, member);
                    }
                    None => {}
                }
            }
            if let (Some(first), Some(last)) = (members.iter().min(), members.iter().max()) {
                spans.push((index, *first, *last));
            }
        }

        let mut counter = 0u32;
        let mut numbers: HashMap<usize, u32> = HashMap::new();
        for (pos, part) in parts.iter().enumerate() {
            let mut starting: Vec<_> = spans.iter().filter(|s| s.1 == pos).collect();
            starting.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
            for &&(group, _, _) in &starting {
                counter += 1;
                numbers.insert(group, counter);
                write_group_start(doc, part_list, &self.score.staff_groups[group], counter);
            }

            write_score_part(doc, part_list, part);

            let mut stopping: Vec<_> = spans.iter().filter(|s| s.2 == pos).collect();
            stopping.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
            for &&(group, _, _) in &stopping {
                if let Some(number) = numbers.get(&group) {
                    let number = number.to_string();
                    doc.empty_element(part_list, "part-group", &[("type", "stop"), ("number", number.as_str())]);
                }
            }
        }
    }
}

fn write_group_start(doc: &mut XmlDocument, part_list: NodeId, group: &StaffGroup, number: u32) {
    let number = number.to_string();
    let node = doc.empty_element(part_list, "part-group", &[("type", "start"), ("number", number.as_str())]);
    if let Some(name) = &group.name {
        doc.text_element(node, "group-name", name);
    }
    if let Some(abbreviation) = &group.abbreviation {
        doc.text_element(node, "group-abbreviation", abbreviation);
    }
    if let Some(symbol) = group.symbol {
        doc.text_element(node, "group-symbol", symbol.xml_name());
    }
    doc.text_element(node, "group-barline", if group.barline { "yes" } else { "no" });
}

fn write_score_part(doc: &mut XmlDocument, part_list: NodeId, part: &ExportedPart) {
    let score_part = doc.element(part_list, "score-part");
    doc.set_attr(score_part, "id", &part.id);
    doc.text_element(score_part, "part-name", &part.name);
    if let Some(abbreviation) = &part.abbreviation {
        doc.text_element(score_part, "part-abbreviation", abbreviation);
    }
    for instrument in &part.instruments {
        let node = doc.element(score_part, "score-instrument");
        doc.set_attr(node, "id", &instrument.id);
        doc.text_element(node, "instrument-name", &instrument.name);
        if let Some(abbreviation) = &instrument.abbreviation {
            doc.text_element(node, "instrument-abbreviation", abbreviation);
        }
    }
    for instrument in &part.instruments {
        let node = doc.element(score_part, "midi-instrument");
        doc.set_attr(node, "id", &instrument.id);
        doc.text_element(node, "midi-channel", &instrument.midi_channel.to_string());
        if let Some(program) = instrument.midi_program {
            doc.text_element(node, "midi-program", &program.to_string());
        }
    }
}

/// One part, one 4/4 measure holding a whole-measure rest
fn placeholder_score(metadata: &ScoreMetadata, config: &ExportConfig) -> Score {
    let mut metadata = metadata.clone();
    if metadata.movement_title.is_none() && metadata.work_title.is_none() {
        metadata.movement_title = Some(config.export.placeholder_title.clone());
    }

    let zero = QuarterLength::from_integer(0);
    let mut measure = Measure::new(1, 1);
    measure.elements = vec![
        MeasureElement::new(2, zero, ElementKind::KeySignature(KeySignature { fifths: 0, mode: None })),
        MeasureElement::new(3, zero, ElementKind::TimeSignature(TimeSignature::new(4, 4))),
        MeasureElement::new(4, zero, ElementKind::Clef(Clef::treble())),
        MeasureElement::new(
            5,
            zero,
            ElementKind::Rest(Rest {
                full_measure: true,
                ..Rest::new(Duration::new(QuarterLength::from_integer(4)))
            }),
        ),
    ];

    Score {
        metadata,
        parts: vec![Part { measures: vec![measure], ..Part::default() }],
        staff_groups: Vec::new(),
    }
}

/// Export a score to a MusicXML 3.1 partwise string
pub fn to_musicxml(score: &Score, config: &ExportConfig) -> Result<String, ExportError> {
    let doc = ScoreExporter::new(score, config).export()?;
    let xml = doc.to_xml_string(config.export.indent)?;
    crate::musicxml_log!("MusicXML serialized: {} bytes", xml.len());
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_pool_skips_percussion_channel() {
        let mut pool = MidiChannelPool::default();
        let channels: Vec<u8> = (0..10).map(|_| pool.allocate(false)).collect();
        assert_eq!(channels, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 11]);
        assert_eq!(pool.allocate(true), 10);
    }

    #[test]
    fn test_channel_pool_wraps_when_exhausted() {
        let mut pool = MidiChannelPool::default();
        for _ in 0..15 {
            pool.allocate(false);
        }
        assert_eq!(pool.allocate(false), 1);
        assert_eq!(pool.allocate(false), 2);
    }

    #[test]
    fn test_reserved_channel_is_skipped() {
        let mut pool = MidiChannelPool::default();
        pool.reserve(1);
        assert_eq!(pool.allocate(false), 2);
    }

    #[test]
    fn test_part_ids() {
        let mut registry = PartIdRegistry::default();
        assert_eq!(registry.assign(None), "P1");
        assert_eq!(registry.assign(Some("violin")), "violin");
        assert_eq!(registry.assign(Some("violin")), "P2");
        assert_eq!(registry.assign(Some("1st violin")), "P3");
        assert_eq!(registry.assign(Some("P4")), "P4");
        assert_eq!(registry.assign(None), "P5");
    }

    #[test]
    fn test_placeholder_for_empty_score() {
        let config = ExportConfig::default();
        let xml = to_musicxml(&Score::default(), &config).unwrap();
        assert!(xml.contains("<movement-title>Untitled</movement-title>"));
        assert!(xml.contains(r#"<score-part id="P1">"#));
        assert!(xml.contains(r#"<rest measure="yes"/>"#));
        assert!(xml.contains("<!DOCTYPE score-partwise PUBLIC"));
    }

    #[test]
    fn test_nested_part_groups_reuse_start_numbers() {
        let mut score = Score::default();
        for i in 0..3 {
            let mut measure = Measure::new(1, 1);
            measure.elements.push(MeasureElement::new(
                10 + i,
                QuarterLength::from_integer(0),
                ElementKind::Rest(Rest::new(Duration::new(QuarterLength::from_integer(4)))),
            ));
            score.parts.push(Part { measures: vec![measure], ..Part::default() });
        }
        score.staff_groups.push(StaffGroup { parts: vec![1, 2], barline: true, ..StaffGroup::default() });
        score.staff_groups.push(StaffGroup { parts: vec![0, 1, 2], barline: false, ..StaffGroup::default() });

        let doc = ScoreExporter::new(&score, &ExportConfig::default()).export().unwrap();
        let root = doc.root().unwrap();
        let part_list = doc.find_child(root, "part-list").unwrap();
        let sequence: Vec<String> = doc
            .children(part_list)
            .iter()
            .map(|&c| match doc.tag(c) {
                Some("part-group") => format!(
                    "{}{}",
                    doc.attr(c, "type").unwrap_or_default(),
                    doc.attr(c, "number").unwrap_or_default()
                ),
                Some(tag) => format!("{}:{}", tag, doc.attr(c, "id").unwrap_or_default()),
                None => String::new(),
            })
            .collect();
        assert_eq!(
            sequence,
            vec!["start1", "score-part:P1", "start2", "score-part:P2", "score-part:P3", "stop2", "stop1"]
        );
    }
}
