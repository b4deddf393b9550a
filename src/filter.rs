//! Filter engine - decides which records are visible
//!
//! [`FilterState`] is a plain value; [`matches`] and [`first_failure`] are
//! pure functions over a record and a state. [`FilterStore`] owns the current
//! state for a view and versions every edit.
//!
//! Empty sets and `None` mean "no restriction". All active predicates are
//! AND-combined.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::records::{Record, SequencingStatus, Source};

/// Complete filter selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub genus: Option<String>,
    pub country: Option<String>,
    /// Case-insensitive substring of the record id
    pub camid_search: Option<String>,
    pub species: BTreeSet<String>,
    pub subspecies: BTreeSet<String>,
    pub mimicry_rings: BTreeSet<String>,
    pub statuses: BTreeSet<SequencingStatus>,
    pub sources: BTreeSet<Source>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

/// The individual checks [`matches`] performs, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Genus,
    Country,
    CamidSearch,
    Species,
    Subspecies,
    MimicryRing,
    Status,
    Source,
    /// A date bound is set but the record is undated
    DateMissing,
    DateRange,
}

/// True when `record` passes every active filter
#[inline]
pub fn matches(record: &Record, filters: &FilterState) -> bool {
    first_failure(record, filters).is_none()
}

/// The first predicate that excludes `record`, or `None` if it is visible
pub fn first_failure(record: &Record, filters: &FilterState) -> Option<Predicate> {
    if let Some(genus) = &filters.genus {
        if record.genus != *genus {
            return Some(Predicate::Genus);
        }
    }
    if let Some(country) = &filters.country {
        if record.country.as_deref() != Some(country.as_str()) {
            return Some(Predicate::Country);
        }
    }
    if let Some(needle) = &filters.camid_search {
        if !contains_ignore_ascii_case(&record.id, needle) {
            return Some(Predicate::CamidSearch);
        }
    }

    if !allows(&filters.species, Some(record.species.as_str())) {
        return Some(Predicate::Species);
    }
    if !allows(&filters.subspecies, record.subspecies.as_deref()) {
        return Some(Predicate::Subspecies);
    }
    if !allows(&filters.mimicry_rings, record.mimicry_ring.as_deref()) {
        return Some(Predicate::MimicryRing);
    }
    if !filters.statuses.is_empty() && !filters.statuses.contains(&record.sequencing_status) {
        return Some(Predicate::Status);
    }
    if !filters.sources.is_empty() && !filters.sources.contains(&record.source) {
        return Some(Predicate::Source);
    }

    if filters.date_start.is_some() || filters.date_end.is_some() {
        let Some(date) = record.observation_date else {
            return Some(Predicate::DateMissing);
        };
        let after_start = filters.date_start.map_or(true, |start| date >= start);
        let before_end = filters.date_end.map_or(true, |end| date <= end);
        if !(after_start && before_end) {
            return Some(Predicate::DateRange);
        }
    }

    None
}

/// Empty set allows everything; an absent value never belongs to a non-empty set
fn allows(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    set.is_empty() || value.map_or(false, |v| set.contains(v))
}

/// ASCII case-insensitive substring test without allocating
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    if n.is_empty() {
        return true;
    }
    h.len() >= n.len() && h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

/// A single user edit to the filter selection
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEdit {
    Genus(Option<String>),
    Country(Option<String>),
    CamidSearch(Option<String>),
    Species(BTreeSet<String>),
    Subspecies(BTreeSet<String>),
    MimicryRings(BTreeSet<String>),
    Statuses(BTreeSet<SequencingStatus>),
    Sources(BTreeSet<Source>),
    DateStart(Option<NaiveDate>),
    DateEnd(Option<NaiveDate>),
}

/// Blank strings mean "cleared"
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FilterState {
    /// Merge one edit, keeping the state valid.
    ///
    /// Taxonomy cascades downward: a new genus clears species and subspecies,
    /// new species clear subspecies. A bound that would invert the date range
    /// clears the opposite bound.
    pub fn apply(&mut self, edit: FilterEdit) {
        match edit {
            FilterEdit::Genus(genus) => {
                let genus = non_blank(genus);
                if genus != self.genus {
                    self.species.clear();
                    self.subspecies.clear();
                }
                self.genus = genus;
            }
            FilterEdit::Country(country) => self.country = non_blank(country),
            FilterEdit::CamidSearch(search) => self.camid_search = non_blank(search),
            FilterEdit::Species(species) => {
                if species != self.species {
                    self.subspecies.clear();
                }
                self.species = species;
            }
            FilterEdit::Subspecies(subspecies) => self.subspecies = subspecies,
            FilterEdit::MimicryRings(rings) => self.mimicry_rings = rings,
            FilterEdit::Statuses(statuses) => self.statuses = statuses,
            FilterEdit::Sources(sources) => self.sources = sources,
            FilterEdit::DateStart(start) => {
                if let (Some(start), Some(end)) = (start, self.date_end) {
                    if start > end {
                        self.date_end = None;
                    }
                }
                self.date_start = start;
            }
            FilterEdit::DateEnd(end) => {
                if let (Some(start), Some(end)) = (self.date_start, end) {
                    if start > end {
                        self.date_start = None;
                    }
                }
                self.date_end = end;
            }
        }
    }

    /// Number of filter categories currently restricting the view
    pub fn active_count(&self) -> usize {
        [
            self.genus.is_some(),
            self.country.is_some(),
            self.camid_search.is_some(),
            !self.species.is_empty(),
            !self.subspecies.is_empty(),
            !self.mimicry_rings.is_empty(),
            !self.statuses.is_empty(),
            !self.sources.is_empty(),
            self.date_start.is_some() || self.date_end.is_some(),
        ]
        .into_iter()
        .filter(|&active| active)
        .count()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.active_count() == 0
    }
}

/// Owner of the live filter selection for one view.
///
/// Every change bumps `version`, so consumers can tell snapshots apart.
#[derive(Debug, Default)]
pub struct FilterStore {
    state: FilterState,
    version: u64,
}

impl FilterStore {
    pub fn new(state: FilterState) -> Self {
        Self { state, version: 0 }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Merge one edit and return the new version
    pub fn edit(&mut self, edit: FilterEdit) -> u64 {
        tracing::debug!(?edit, "Applying filter edit");
        self.state.apply(edit);
        self.bump()
    }

    /// Swap in a complete state (URL hydration)
    pub fn replace(&mut self, state: FilterState) -> u64 {
        self.state = state;
        self.bump()
    }

    /// Back to "no filters"
    pub fn reset(&mut self) -> u64 {
        tracing::debug!("Resetting filters");
        self.replace(FilterState::default())
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}
