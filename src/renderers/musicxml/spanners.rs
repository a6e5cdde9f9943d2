//! Spanner lookup for a part
//!
//! Spanners hold their members by `ElementId`. Before a part is exported the
//! index inverts that relation so each note can ask which spanners it starts
//! or ends. Number attributes are handed out per family, lowest free first,
//! and returned when the spanner's last member has been written.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{ElementId, Part, Spanner, SpannerKind};

use super::errors::ExportErrorKind;

/// Membership of one element in one spanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannerRef {
    /// Index into `Part::spanners`
    pub spanner: usize,
    pub is_first: bool,
    pub is_last: bool,
}

#[derive(Debug, Default)]
pub struct SpannerIndex<'a> {
    spanners: &'a [Spanner],
    by_member: HashMap<ElementId, Vec<SpannerRef>>,
}

impl<'a> SpannerIndex<'a> {
    /// Index every spanner of `part`, rejecting members that are not in the part
    pub fn build(part: &'a Part) -> Result<Self, ExportErrorKind> {
        let mut element_ids: HashSet<ElementId> = HashSet::new();
        let mut measure_ids: HashSet<ElementId> = HashSet::new();
        for measure in &part.measures {
            measure_ids.insert(measure.id);
            element_ids.extend(measure.all_elements().map(|e| e.id));
        }

        let mut by_member: HashMap<ElementId, Vec<SpannerRef>> = HashMap::new();
        for (index, spanner) in part.spanners.iter().enumerate() {
            if spanner.members.is_empty() {
                crate::musicxml_log!("skipping {} spanner {} with no members", spanner.kind.family(), index);
                continue;
            }

            let targets = match spanner.kind {
                SpannerKind::RepeatBracket { .. } => &measure_ids,
                _ => &element_ids,
            };
            let last = spanner.members.len() - 1;
            for (position, member) in spanner.members.iter().enumerate() {
                if !targets.contains(member) {
                    return Err(ExportErrorKind::UnresolvedSpannerTarget {
                        spanner: format!("{} #{}", spanner.kind.family(), index),
                        target: *member,
                    });
                }
                by_member.entry(*member).or_default().push(SpannerRef {
                    spanner: index,
                    is_first: position == 0,
                    is_last: position == last,
                });
            }
        }

        Ok(Self { spanners: &part.spanners, by_member })
    }

    /// Spanners that `id` belongs to, in spanner order
    pub fn memberships(&self, id: ElementId) -> &[SpannerRef] {
        self.by_member.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn spanner(&self, index: usize) -> &'a Spanner {
        &self.spanners[index]
    }

    /// Memberships of `id` paired with their spanner, filtered by `pick`
    pub fn select<F>(&self, id: ElementId, pick: F) -> Vec<(SpannerRef, &'a Spanner)>
    where
        F: Fn(&SpannerKind) -> bool,
    {
        self.memberships(id)
            .iter()
            .map(|r| (*r, self.spanner(r.spanner)))
            .filter(|(_, s)| pick(&s.kind))
            .collect()
    }
}

/// Highest number handed out per spanner family
pub type NumberFloor = HashMap<&'static str, u8>;

/// Allocator for the `number` attribute of spanner start/stop markers
///
/// Staves that end up in one joined part are exported one after another, so
/// each later staff starts above the peak of the staves before it.
#[derive(Debug, Default)]
pub struct SpannerNumbers {
    in_use: HashMap<&'static str, BTreeSet<u8>>,
    assigned: HashMap<usize, (&'static str, u8)>,
    floor: NumberFloor,
    peak: NumberFloor,
}

impl SpannerNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate only numbers above `floor` in each family
    pub fn above(floor: NumberFloor) -> Self {
        Self { peak: floor.clone(), floor, ..Self::default() }
    }

    /// Highest number used per family, including the starting floor
    pub fn peak(&self) -> &NumberFloor {
        &self.peak
    }

    /// Number for `spanner`, allocating the lowest free one of its family on first use
    pub fn number_for(&mut self, spanner: usize, family: &'static str) -> u8 {
        if let Some((_, number)) = self.assigned.get(&spanner) {
            return *number;
        }
        let used = self.in_use.entry(family).or_default();
        let mut number = self.floor.get(family).copied().unwrap_or(0).saturating_add(1);
        while used.contains(&number) && number < u8::MAX {
            number += 1;
        }
        used.insert(number);
        self.assigned.insert(spanner, (family, number));
        let peak = self.peak.entry(family).or_insert(0);
        *peak = (*peak).max(number);
        number
    }

    /// Return the number of `spanner` to its family's pool
    pub fn release(&mut self, spanner: usize) {
        if let Some((family, number)) = self.assigned.remove(&spanner) {
            if let Some(used) = self.in_use.get_mut(family) {
                used.remove(&number);
            }
        }
    }
}
