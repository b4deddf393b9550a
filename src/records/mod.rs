//! Specimen records - the immutable data the whole pipeline reads
//!
//! Records come out of the ETL pipeline as a JSON array (`map_points.json`).
//! Each element is deserialized loosely into a [`RawRecord`] and then
//! validated into a [`Record`]; anything that fails validation is dropped by
//! the loader instead of failing the whole document.

pub mod field;
pub mod loader;

pub use field::{Field, FieldError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error("unknown sequencing status '{0}'")]
    UnknownStatus(String),
    #[error("unknown source '{0}'")]
    UnknownSource(String),
}

/// Sequencing / availability status of a specimen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SequencingStatus {
    #[serde(rename = "Sequenced")]
    Sequenced,
    #[serde(rename = "Tissue Available")]
    TissueAvailable,
    #[serde(rename = "Preserved Specimen")]
    PreservedSpecimen,
    #[serde(rename = "Published")]
    Published,
    #[serde(rename = "GBIF Record")]
    GbifRecord,
}

impl SequencingStatus {
    pub const ALL: [SequencingStatus; 5] = [
        SequencingStatus::Sequenced,
        SequencingStatus::TissueAvailable,
        SequencingStatus::PreservedSpecimen,
        SequencingStatus::Published,
        SequencingStatus::GbifRecord,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SequencingStatus::Sequenced => "Sequenced",
            SequencingStatus::TissueAvailable => "Tissue Available",
            SequencingStatus::PreservedSpecimen => "Preserved Specimen",
            SequencingStatus::Published => "Published",
            SequencingStatus::GbifRecord => "GBIF Record",
        }
    }
}

impl fmt::Display for SequencingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for SequencingStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| RecordError::UnknownStatus(s.to_string()))
    }
}

/// Provenance of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "Dore et al. (2025)")]
    Dore,
    #[serde(rename = "Sanger Institute")]
    Sanger,
    #[serde(rename = "GBIF")]
    Gbif,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Dore, Source::Sanger, Source::Gbif];

    pub fn label(&self) -> &'static str {
        match self {
            Source::Dore => "Dore et al. (2025)",
            Source::Sanger => "Sanger Institute",
            Source::Gbif => "GBIF",
        }
    }

    /// Short token used in URLs
    pub fn slug(&self) -> &'static str {
        match self {
            Source::Dore => "dore",
            Source::Sanger => "sanger",
            Source::Gbif => "gbif",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Source {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|source| source.label().eq_ignore_ascii_case(s) || source.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| RecordError::UnknownSource(s.to_string()))
    }
}

/// One specimen occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub scientific_name: String,
    pub genus: String,
    pub species: String,
    pub subspecies: Option<String>,
    pub family: String,
    pub tribe: String,
    pub lat: f64,
    pub lng: f64,
    pub mimicry_ring: Option<String>,
    pub sequencing_status: SequencingStatus,
    pub source: Source,
    pub country: Option<String>,
    pub observation_date: Option<NaiveDate>,
    pub image_url: Option<String>,
}

/// Element of `map_points.json` before validation.
///
/// Every field is optional so that one bad element never fails the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    pub id: Option<String>,
    #[serde(alias = "scientificName")]
    pub scientific_name: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub subspecies: Option<String>,
    pub family: Option<String>,
    pub tribe: Option<String>,
    pub lat: Option<f64>,
    #[serde(alias = "lon")]
    pub lng: Option<f64>,
    #[serde(alias = "mimicryRing")]
    pub mimicry_ring: Option<String>,
    #[serde(alias = "sequencingStatus")]
    pub sequencing_status: Option<String>,
    pub source: Option<String>,
    pub country: Option<String>,
    #[serde(alias = "observationDate", alias = "date")]
    pub observation_date: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// Placeholders the ETL pipeline writes for missing values
const NULL_MARKERS: [&str; 5] = ["", "nan", "none", "na", "null"];

fn clean(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if NULL_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(trimmed)) {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`clean`] but also treats the pipeline's "Unknown" filler as absent
fn clean_category(value: Option<String>) -> Option<String> {
    clean(value).filter(|v| !v.eq_ignore_ascii_case("unknown"))
}

fn required(value: Option<String>, name: &'static str) -> Result<String, RecordError> {
    clean(value).ok_or(RecordError::MissingField(name))
}

/// `YYYY-MM-DD`, optionally followed by a `T` or space separated time
fn parse_observation_date(text: &str) -> chrono::ParseResult<NaiveDate> {
    let day = text.split(|c| c == 'T' || c == ' ').next().unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
}

impl TryFrom<RawRecord> for Record {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let id = required(raw.id, "id")?;
        let lat = raw.lat.ok_or(RecordError::MissingField("lat"))?;
        let lng = raw.lng.ok_or(RecordError::MissingField("lng"))?;
        if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(RecordError::InvalidCoordinates { lat, lng });
        }

        let sequencing_status: SequencingStatus = required(raw.sequencing_status, "sequencing_status")?.parse()?;
        let source: Source = required(raw.source, "source")?.parse()?;

        let observation_date = match clean(raw.observation_date) {
            Some(text) => match parse_observation_date(&text) {
                Ok(date) => Some(date),
                Err(e) => {
                    tracing::debug!("Record '{}': unreadable date '{}' ({}), treating as undated", id, text, e);
                    None
                }
            },
            None => None,
        };

        Ok(Record {
            scientific_name: required(raw.scientific_name, "scientific_name")?,
            genus: required(raw.genus, "genus")?,
            species: required(raw.species, "species")?,
            subspecies: clean(raw.subspecies),
            family: required(raw.family, "family")?,
            tribe: required(raw.tribe, "tribe")?,
            lat,
            lng,
            mimicry_ring: clean_category(raw.mimicry_ring),
            sequencing_status,
            source,
            country: clean_category(raw.country),
            observation_date,
            image_url: clean(raw.image_url),
            id,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawRecord {
        RawRecord {
            id: Some("CAM012345".into()),
            scientific_name: Some("Mechanitis menophilus".into()),
            genus: Some("Mechanitis".into()),
            species: Some("menophilus".into()),
            family: Some("Nymphalidae".into()),
            tribe: Some("Ithomiini".into()),
            lat: Some(-0.5),
            lng: Some(-77.9),
            sequencing_status: Some("Tissue Available".into()),
            source: Some("Sanger Institute".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record() {
        let record = Record::try_from(raw()).unwrap();
        assert_eq!(record.sequencing_status, SequencingStatus::TissueAvailable);
        assert_eq!(record.source, Source::Sanger);
        assert_eq!(record.subspecies, None);
    }

    #[test]
    fn test_missing_coordinates_rejected() {
        let mut r = raw();
        r.lat = None;
        assert_eq!(Record::try_from(r), Err(RecordError::MissingField("lat")));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let mut r = raw();
        r.lng = Some(200.0);
        assert!(matches!(Record::try_from(r), Err(RecordError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut r = raw();
        r.sequencing_status = Some("Lost".into());
        assert_eq!(Record::try_from(r), Err(RecordError::UnknownStatus("Lost".into())));
    }

    #[test]
    fn test_placeholders_normalized() {
        let mut r = raw();
        r.subspecies = Some("nan".into());
        r.mimicry_ring = Some("Unknown".into());
        r.country = Some(" Peru ".into());
        r.observation_date = Some("14/06/2021".into());
        let record = Record::try_from(r).unwrap();
        assert_eq!(record.subspecies, None);
        assert_eq!(record.mimicry_ring, None);
        assert_eq!(record.country.as_deref(), Some("Peru"));
        assert_eq!(record.observation_date, None);
    }

    #[test]
    fn test_timestamp_keeps_date() {
        let mut r = raw();
        r.observation_date = Some("2019-05-12T00:00:00".into());
        let record = Record::try_from(r).unwrap();
        assert_eq!(record.observation_date, Some(fixtures::date("2019-05-12")));
    }

    #[test]
    fn test_date_suffixes() {
        assert_eq!(parse_observation_date("2019-05-12 08:30:00"), Ok(fixtures::date("2019-05-12")));
        assert!(parse_observation_date("2019-05-12garbage").is_err());
        assert!(parse_observation_date("2019-05-1").is_err());

        let mut r = raw();
        r.observation_date = Some("2019-05-12garbage".into());
        let record = Record::try_from(r).unwrap();
        assert_eq!(record.observation_date, None);
    }

    #[test]
    fn test_source_parses_label_and_slug() {
        assert_eq!("GBIF".parse::<Source>(), Ok(Source::Gbif));
        assert_eq!("dore".parse::<Source>(), Ok(Source::Dore));
        assert!("Museum".parse::<Source>().is_err());
    }
}
