//! Record loader - reads `map_points.json` into validated records
//!
//! The document must be a JSON array. Elements that are not objects, have the
//! wrong types, or fail validation are skipped and counted; a duplicate id
//! keeps the first occurrence.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use super::{RawRecord, Record};

/// Outcome of a load: the surviving records plus how many were dropped
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<Record>,
    pub skipped: usize,
    pub duplicates: usize,
}

/// Load and validate records from a JSON file
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<LoadReport> {
    let path = path.as_ref();
    tracing::info!("Loading records from {:?}", path);
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let report = parse_records(&content)?;
    tracing::info!(
        "Loaded {} records ({} skipped, {} duplicate ids)",
        report.records.len(),
        report.skipped,
        report.duplicates
    );
    Ok(report)
}

/// Parse a JSON array document into records
pub fn parse_records(content: &str) -> Result<LoadReport> {
    let elements: Vec<serde_json::Value> =
        serde_json::from_str(content).context("record document is not a JSON array")?;

    let mut report = LoadReport {
        records: Vec::with_capacity(elements.len()),
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(elements.len());

    for (index, element) in elements.into_iter().enumerate() {
        let raw: RawRecord = match serde_json::from_value(element) {
            Ok(raw) => raw,
            Err(e) => {
                crate::log_skip!(e, index = index);
                report.skipped += 1;
                continue;
            }
        };

        match Record::try_from(raw) {
            Ok(record) => {
                if seen.insert(record.id.clone()) {
                    report.records.push(record);
                } else {
                    tracing::warn!(index, id = %record.id, "Duplicate record id, keeping first");
                    report.duplicates += 1;
                }
            }
            Err(e) => {
                crate::log_skip!(e, index = index);
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}
