//! Part exporter
//!
//! Turns one `Part` (one staff) into a detached `<part>` subtree. The
//! subtree is only attached to the document after the part-staff merge has
//! run, so joined staves can still be rewritten in place.

use crate::config::ExportConfig;
use crate::models::{Clef, ElementKind, Part, QuarterLength, TimeSignature, Transposition};

use super::builder::{NodeId, XmlDocument};
use super::converter::ScoreContext;
use super::duration::Divisions;
use super::errors::{ExportError, ExportErrorKind, ExportResult};
use super::measure::export_measure;
use super::spanners::{NumberFloor, SpannerIndex, SpannerNumbers};

/// Instrument after id and MIDI channel assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstrument {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub midi_channel: u8,
    pub midi_program: Option<u8>,
    pub percussion: bool,
}

/// A part subtree waiting to be attached to the score
#[derive(Debug, Clone)]
pub struct ExportedPart {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub instruments: Vec<ResolvedInstrument>,
    /// Detached `<part>` node
    pub node: NodeId,
    /// Index of the source part in `Score::parts`
    pub score_index: usize,
    /// Highest spanner numbers written, per family
    pub spanner_peak: NumberFloor,
}

/// State carried from measure to measure while one part is exported
pub struct PartContext<'a> {
    pub part: &'a Part,
    pub config: &'a ExportConfig,
    pub divisions: Divisions,
    pub spanners: SpannerIndex<'a>,
    pub numbers: SpannerNumbers,
    /// Clef in effect, for rest positioning
    pub clef: Clef,
    /// Time signature in effect, for full-measure rests
    pub time: Option<TimeSignature>,
    /// Written in the first measure's attributes
    pub transpose: Option<Transposition>,
}

impl<'a> PartContext<'a> {
    pub fn new(part: &'a Part, config: &'a ExportConfig, divisions: Divisions, spanners: SpannerIndex<'a>) -> Self {
        let transpose = if part.at_sounding_pitch {
            None
        } else {
            part.instruments
                .first()
                .and_then(|i| i.transposition)
                .filter(|t| !t.is_identity())
        };
        Self {
            part,
            config,
            divisions,
            spanners,
            numbers: SpannerNumbers::new(),
            clef: Clef::treble(),
            time: None,
            transpose,
        }
    }

    /// Length of a full bar under the current time signature, 4/4 when none was given
    pub fn bar_duration(&self) -> QuarterLength {
        self.time
            .as_ref()
            .map(TimeSignature::bar_duration)
            .unwrap_or_else(|| QuarterLength::from_integer(4))
    }

    pub fn units(&self, quarter_length: QuarterLength) -> ExportResult<u64> {
        self.divisions.to_units(quarter_length).map_err(ExportError::new)
    }
}

/// Divisions needed by every offset, duration, and bar length of `part`
pub fn part_divisions(part: &Part) -> ExportResult<Divisions> {
    let mut values = Vec::new();
    for measure in &part.measures {
        for element in measure.all_elements() {
            values.push(element.offset);
            if let Some(duration) = element.duration() {
                if duration.tuplet_ratio().is_none() {
                    let ratios: Vec<String> =
                        duration.tuplets.iter().map(|t| format!("{}:{}", t.actual, t.normal)).collect();
                    return Err(ExportError::new(ExportErrorKind::InvalidTupletRatio(ratios.join(" in ")))
                        .at_measure(measure.number_label())
                        .in_part(part.display_name()));
                }
                if !element.is_grace() {
                    values.push(duration.quarter_length);
                }
            }
            if let ElementKind::TimeSignature(time) = &element.kind {
                values.push(time.bar_duration());
            }
        }
    }
    Divisions::for_quarter_lengths(values).map_err(|kind| ExportError::new(kind).in_part(part.display_name()))
}

pub struct PartExporter<'a> {
    part: &'a Part,
    index: usize,
    config: &'a ExportConfig,
    divisions: Option<Divisions>,
    number_floor: NumberFloor,
}

impl<'a> PartExporter<'a> {
    pub fn new(part: &'a Part, index: usize, config: &'a ExportConfig) -> Self {
        Self { part, index, config, divisions: None, number_floor: NumberFloor::new() }
    }

    /// Number spanners above the ones already used by earlier staves of the same joined part
    pub fn with_number_floor(mut self, floor: NumberFloor) -> Self {
        self.number_floor = floor;
        self
    }

    /// Use fixed divisions instead of the part's own (joined staves share one lattice)
    pub fn with_divisions(mut self, divisions: Divisions) -> Self {
        self.divisions = Some(divisions);
        self
    }

    pub fn export(&self, doc: &mut XmlDocument, score_ctx: &mut ScoreContext) -> ExportResult<ExportedPart> {
        let name = self.part.display_name().to_string();
        let id = score_ctx.part_ids.assign(self.part.id.as_deref());
        let instruments = self.resolve_instruments(&id, score_ctx);

        let divisions = match self.divisions {
            Some(divisions) => divisions,
            None => part_divisions(self.part)?,
        };
        let spanners = SpannerIndex::build(self.part).map_err(|kind| ExportError::new(kind).in_part(&name))?;
        let mut ctx = PartContext::new(self.part, self.config, divisions, spanners);
        ctx.numbers = SpannerNumbers::above(self.number_floor.clone());

        crate::musicxml_log!(
            "exporting part '{}' as {} ({} measures, divisions {})",
            name,
            id,
            self.part.measures.len(),
            divisions.per_quarter()
        );

        let node = doc.create_element("part");
        doc.set_attr(node, "id", &id);

        if self.part.measures.is_empty() {
            let measure = doc.element(node, "measure");
            doc.set_attr(measure, "number", "1");
            let attributes = doc.element(measure, "attributes");
            doc.text_element(attributes, "divisions", &divisions.per_quarter().to_string());
        }

        for (i, measure) in self.part.measures.iter().enumerate() {
            let measure_node = export_measure(doc, &mut ctx, measure, i == 0).map_err(|e| e.in_part(&name))?;
            doc.append(node, measure_node);
        }

        Ok(ExportedPart {
            id,
            name: self.part.name.clone().unwrap_or_default(),
            abbreviation: self.part.abbreviation.clone(),
            instruments,
            node,
            score_index: self.index,
            spanner_peak: ctx.numbers.peak().clone(),
        })
    }

    /// First instrument gets its own channel; later ones without MIDI settings share it
    fn resolve_instruments(&self, part_id: &str, score_ctx: &mut ScoreContext) -> Vec<ResolvedInstrument> {
        let mut resolved: Vec<ResolvedInstrument> = Vec::new();
        let default_name = self.part.name.clone().unwrap_or_default();

        if self.part.instruments.is_empty() {
            let channel = score_ctx.channels.allocate(false);
            resolved.push(ResolvedInstrument {
                id: format!("{}-I1", part_id),
                name: default_name,
                abbreviation: self.part.abbreviation.clone(),
                midi_channel: channel,
                midi_program: None,
                percussion: false,
            });
            return resolved;
        }

        for (i, instrument) in self.part.instruments.iter().enumerate() {
            let channel = match (instrument.midi_channel, resolved.first()) {
                (Some(channel), _) => {
                    score_ctx.channels.reserve(channel);
                    channel
                }
                (None, Some(first)) if !instrument.has_midi_settings() => first.midi_channel,
                (None, _) => score_ctx.channels.allocate(instrument.percussion),
            };
            resolved.push(ResolvedInstrument {
                id: format!("{}-I{}", part_id, i + 1),
                name: instrument.name.clone().unwrap_or_else(|| default_name.clone()),
                abbreviation: instrument.abbreviation.clone(),
                midi_channel: channel,
                midi_program: instrument.midi_program,
                percussion: instrument.percussion,
            });
        }
        resolved
    }
}
