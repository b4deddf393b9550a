//! URL query-string form of [`FilterState`]
//!
//! Keys: `genus`, `country`, `camid`, `species`, `subspecies`, `mimicry`,
//! `status`, `source`, `from`, `to`. Multi-value keys hold comma-separated,
//! individually percent-encoded values. Hydration never fails: unknown keys
//! are ignored and bad values reset their field.

use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::filter::FilterState;
use crate::records::{SequencingStatus, Source};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl FilterState {
    /// Serialize the active filters; unrestricted fields are omitted
    pub fn to_query(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();

        let mut scalar = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                pairs.push(format!("{}={}", key, urlencoding::encode(v)));
            }
        };
        scalar("genus", &self.genus);
        scalar("country", &self.country);
        scalar("camid", &self.camid_search);

        push_multi(&mut pairs, "species", self.species.iter().map(String::as_str));
        push_multi(&mut pairs, "subspecies", self.subspecies.iter().map(String::as_str));
        push_multi(&mut pairs, "mimicry", self.mimicry_rings.iter().map(String::as_str));
        push_multi(&mut pairs, "status", self.statuses.iter().map(SequencingStatus::label));
        push_multi(&mut pairs, "source", self.sources.iter().map(Source::slug));

        if let Some(start) = self.date_start {
            pairs.push(format!("from={}", start.format(DATE_FORMAT)));
        }
        if let Some(end) = self.date_end {
            pairs.push(format!("to={}", end.format(DATE_FORMAT)));
        }

        pairs.join("&")
    }

    /// Hydrate from a query string (a leading `?` is accepted)
    pub fn from_query(query: &str) -> Self {
        let mut state = FilterState::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "genus" => state.genus = decode(key, raw),
                "country" => state.country = decode(key, raw),
                "camid" => state.camid_search = decode(key, raw),
                "species" => state.species.extend(decode_multi(key, raw)),
                "subspecies" => state.subspecies.extend(decode_multi(key, raw)),
                "mimicry" => state.mimicry_rings.extend(decode_multi(key, raw)),
                "status" => state.statuses.extend(parse_enum::<SequencingStatus>(key, raw)),
                "source" => state.sources.extend(parse_enum::<Source>(key, raw)),
                "from" => state.date_start = parse_date(key, raw),
                "to" => state.date_end = parse_date(key, raw),
                other => tracing::debug!("Ignoring unknown query key '{}'", other),
            }
        }

        if let (Some(start), Some(end)) = (state.date_start, state.date_end) {
            if start > end {
                tracing::warn!(%start, %end, "Inverted date range in query, dropping 'to'");
                state.date_end = None;
            }
        }

        state
    }
}

fn push_multi<'a>(pairs: &mut Vec<String>, key: &str, values: impl Iterator<Item = &'a str>) {
    let encoded: Vec<Cow<'a, str>> = values.map(urlencoding::encode).collect();
    if !encoded.is_empty() {
        pairs.push(format!("{}={}", key, encoded.join(",")));
    }
}

fn decode(key: &str, raw: &str) -> Option<String> {
    // Form encoding uses '+' for spaces
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(value) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        Err(e) => {
            tracing::warn!(key, value = %raw, "Dropping undecodable query value: {}", e);
            None
        }
    }
}

fn decode_multi(key: &str, raw: &str) -> BTreeSet<String> {
    raw.split(',').filter_map(|part| decode(key, part)).collect()
}

fn parse_enum<T: std::str::FromStr>(key: &str, raw: &str) -> Vec<T> {
    decode_multi(key, raw)
        .into_iter()
        .filter_map(|value| match value.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, %value, "Dropping unknown value from query");
                None
            }
        })
        .collect()
}

fn parse_date(key: &str, raw: &str) -> Option<NaiveDate> {
    let value = decode(key, raw)?;
    match NaiveDate::parse_from_str(&value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(key, %value, "Ignoring malformed date in query: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::date;

    #[test]
    fn test_empty_query_is_default() {
        assert_eq!(FilterState::from_query(""), FilterState::default());
        assert_eq!(FilterState::from_query("?"), FilterState::default());
        assert_eq!(FilterState::default().to_query(), "");
    }

    #[test]
    fn test_full_state_survives_url() {
        let state = FilterState {
            genus: Some("Mechanitis".into()),
            country: Some("French Guiana".into()),
            camid_search: Some("CAM04".into()),
            species: ["polymnia".to_string(), "lysimnia".to_string()].into(),
            subspecies: ["casabranca".to_string()].into(),
            mimicry_rings: ["Tiger, yellow".to_string()].into(),
            statuses: [SequencingStatus::TissueAvailable, SequencingStatus::Sequenced].into(),
            sources: [Source::Dore].into(),
            date_start: Some(date("2001-02-03")),
            date_end: Some(date("2020-12-31")),
        };
        let query = state.to_query();
        assert!(query.contains("country=French%20Guiana"));
        assert!(query.contains("source=dore"));
        assert_eq!(FilterState::from_query(&query), state);
    }

    #[test]
    fn test_unknown_enum_values_dropped() {
        let state = FilterState::from_query("status=Sequenced,Lost&source=gbif,museum");
        assert_eq!(state.statuses, [SequencingStatus::Sequenced].into());
        assert_eq!(state.sources, [Source::Gbif].into());
    }

    #[test]
    fn test_malformed_date_resets_only_that_field() {
        let state = FilterState::from_query("from=2020-13-45&to=2021-01-01&genus=Oleria");
        assert_eq!(state.date_start, None);
        assert_eq!(state.date_end, Some(date("2021-01-01")));
        assert_eq!(state.genus.as_deref(), Some("Oleria"));
    }

    #[test]
    fn test_unknown_keys_and_blanks_ignored() {
        let state = FilterState::from_query("zoom=4&genus=&species=,,&camid");
        assert!(state.is_unrestricted());
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let state = FilterState::from_query("status=Tissue+Available&country=Costa+Rica");
        assert_eq!(state.statuses, [SequencingStatus::TissueAvailable].into());
        assert_eq!(state.country.as_deref(), Some("Costa Rica"));
    }

    #[test]
    fn test_inverted_range_drops_end() {
        let state = FilterState::from_query("from=2020-01-01&to=2019-01-01");
        assert_eq!(state.date_start, Some(date("2020-01-01")));
        assert_eq!(state.date_end, None);
    }
}
