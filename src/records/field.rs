//! Categorical record fields usable for dropdowns and "color by"

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Record;

#[derive(Error, Debug, PartialEq)]
#[error("unknown field '{0}'")]
pub struct FieldError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Genus,
    Species,
    Subspecies,
    MimicryRing,
    SequencingStatus,
    Source,
    Country,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Genus,
        Field::Species,
        Field::Subspecies,
        Field::MimicryRing,
        Field::SequencingStatus,
        Field::Source,
        Field::Country,
    ];

    /// Property name, matching the record's serialized key
    pub fn name(&self) -> &'static str {
        match self {
            Field::Genus => "genus",
            Field::Species => "species",
            Field::Subspecies => "subspecies",
            Field::MimicryRing => "mimicry_ring",
            Field::SequencingStatus => "sequencing_status",
            Field::Source => "source",
            Field::Country => "country",
        }
    }

    /// The record's value for this field, `None` when absent
    #[inline]
    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            Field::Genus => Some(&record.genus),
            Field::Species => Some(&record.species),
            Field::Subspecies => record.subspecies.as_deref(),
            Field::MimicryRing => record.mimicry_ring.as_deref(),
            Field::SequencingStatus => Some(record.sequencing_status.label()),
            Field::Source => Some(record.source.label()),
            Field::Country => record.country.as_deref(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "genus" => Ok(Field::Genus),
            "species" => Ok(Field::Species),
            "subspecies" => Ok(Field::Subspecies),
            "mimicry_ring" | "mimicryring" | "mimicry" => Ok(Field::MimicryRing),
            "sequencing_status" | "sequencingstatus" | "status" => Ok(Field::SequencingStatus),
            "source" => Ok(Field::Source),
            "country" => Ok(Field::Country),
            _ => Err(FieldError(s.to_string())),
        }
    }
}
