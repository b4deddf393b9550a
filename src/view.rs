//! Derived view - everything the map, table and legend need from one pass
//!
//! Value lists for dropdown fields come from the full record set, so a
//! selected option never hides itself. Value lists for legend fields come
//! from the visible records only. The split is per field ([`ViewSpec`]).

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::color::ColorMap;
use crate::filter::{self, FilterState};
use crate::records::{Field, Record, SequencingStatus, Source};

/// Which fields get value lists, and from which record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    /// Options computed over all records
    pub dropdown_fields: Vec<Field>,
    /// Values computed over visible records
    pub legend_fields: Vec<Field>,
}

impl Default for ViewSpec {
    fn default() -> Self {
        Self {
            dropdown_fields: Field::ALL.to_vec(),
            legend_fields: Field::ALL.to_vec(),
        }
    }
}

/// Counts over the visible records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub by_status: BTreeMap<SequencingStatus, usize>,
    pub by_source: BTreeMap<Source, usize>,
    pub with_images: usize,
    pub scientific_names: usize,
    pub genera: usize,
    pub mimicry_rings: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<'a> {
    /// Visible records, in input order
    pub filtered: Vec<&'a Record>,
    pub count: usize,
    pub total_count: usize,
    /// Sorted distinct values over all records, per dropdown field
    pub unique_values: BTreeMap<Field, Vec<&'a str>>,
    /// Sorted distinct values over visible records, per legend field
    pub visible_values: BTreeMap<Field, Vec<&'a str>>,
    pub summary: Summary,
}

impl<'a> DerivedView<'a> {
    /// Dropdown options for a field (empty if the field was not requested)
    pub fn options(&self, field: Field) -> &[&'a str] {
        self.unique_values.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visible values for a field (empty if the field was not requested)
    pub fn visible(&self, field: Field) -> &[&'a str] {
        self.visible_values.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values to color by: the visible list when the field is in legend
    /// scope, otherwise a scan of the filtered records
    pub fn color_values(&self, field: Field) -> Vec<&'a str> {
        match self.visible_values.get(&field) {
            Some(values) => values.clone(),
            None => {
                let distinct: BTreeSet<&'a str> = self.filtered.iter().filter_map(|r| field.value(r)).collect();
                distinct.into_iter().collect()
            }
        }
    }
}

/// Point handed to the map renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint<'a> {
    pub id: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub color: &'a str,
}

/// Filter `records` and derive every view artifact in a single pass
pub fn build<'a>(records: &'a [Record], filters: &FilterState, spec: &ViewSpec) -> DerivedView<'a> {
    let started = Instant::now();

    let mut options: Vec<(Field, BTreeSet<&'a str>)> =
        spec.dropdown_fields.iter().map(|&f| (f, BTreeSet::new())).collect();
    let mut visible: Vec<(Field, BTreeSet<&'a str>)> =
        spec.legend_fields.iter().map(|&f| (f, BTreeSet::new())).collect();

    let mut filtered = Vec::new();
    let mut summary = Summary::default();
    let mut names: BTreeSet<&'a str> = BTreeSet::new();
    let mut genera: BTreeSet<&'a str> = BTreeSet::new();
    let mut rings: BTreeSet<&'a str> = BTreeSet::new();

    for record in records {
        collect_values(&mut options, record);

        if !filter::matches(record, filters) {
            continue;
        }
        collect_values(&mut visible, record);

        *summary.by_status.entry(record.sequencing_status).or_insert(0) += 1;
        *summary.by_source.entry(record.source).or_insert(0) += 1;
        if record.image_url.is_some() {
            summary.with_images += 1;
        }
        names.insert(&record.scientific_name);
        genera.insert(&record.genus);
        if let Some(ring) = &record.mimicry_ring {
            rings.insert(ring);
        }

        filtered.push(record);
    }

    summary.scientific_names = names.len();
    summary.genera = genera.len();
    summary.mimicry_rings = rings.len();

    tracing::debug!(
        visible = filtered.len(),
        total = records.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Derived view rebuilt"
    );

    DerivedView {
        count: filtered.len(),
        total_count: records.len(),
        filtered,
        unique_values: into_lists(options),
        visible_values: into_lists(visible),
        summary,
    }
}

fn collect_values<'a>(sets: &mut [(Field, BTreeSet<&'a str>)], record: &'a Record) {
    for (field, set) in sets.iter_mut() {
        if let Some(value) = field.value(record) {
            set.insert(value);
        }
    }
}

fn into_lists<'a>(sets: Vec<(Field, BTreeSet<&'a str>)>) -> BTreeMap<Field, Vec<&'a str>> {
    sets.into_iter()
        .map(|(field, set)| (field, set.into_iter().collect()))
        .collect()
}

/// Visible records as colored map points
pub fn map_points<'a>(view: &DerivedView<'a>, colors: &'a ColorMap) -> Vec<MapPoint<'a>> {
    view.filtered
        .iter()
        .map(|record| MapPoint {
            id: &record.id,
            lat: record.lat,
            lng: record.lng,
            color: colors.color_for(record),
        })
        .collect()
}

/// Identity of the inputs a cached view was built from
#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    records_ptr: usize,
    records_len: usize,
    filters: FilterState,
    spec: ViewSpec,
}

impl CacheKey {
    fn new(records: &[Record], filters: &FilterState, spec: &ViewSpec) -> Self {
        Self {
            records_ptr: records.as_ptr() as usize,
            records_len: records.len(),
            filters: filters.clone(),
            spec: spec.clone(),
        }
    }

    fn is_for(&self, records: &[Record], filters: &FilterState, spec: &ViewSpec) -> bool {
        self.records_ptr == records.as_ptr() as usize
            && self.records_len == records.len()
            && self.filters == *filters
            && self.spec == *spec
    }
}

/// Memoizes the most recent [`build`].
///
/// Records are matched by slice identity, filters and spec by value.
#[derive(Debug, Default)]
pub struct ViewCache<'a> {
    cached: Option<(CacheKey, DerivedView<'a>)>,
    hits: u64,
    misses: u64,
}

impl<'a> ViewCache<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, records: &'a [Record], filters: &FilterState, spec: &ViewSpec) -> &DerivedView<'a> {
        let hit = self
            .cached
            .as_ref()
            .is_some_and(|(key, _)| key.is_for(records, filters, spec));

        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.cached = None;
        }

        let (_, view) = self
            .cached
            .get_or_insert_with(|| (CacheKey::new(records, filters, spec), build(records, filters, spec)));
        view
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }
}
