//! Color assignment and legends for the "color by" field
//!
//! Status and source have fixed semantic palettes. Open-ended taxonomic
//! fields get an even hue spread over their sorted distinct values, so the
//! same set of values always gets the same colors regardless of discovery
//! order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::records::{Field, Record, SequencingStatus, Source};

/// Color settings, overridable from the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// HSL saturation in percent for generated colors
    pub saturation: u8,
    /// HSL lightness in percent for generated colors
    pub lightness: u8,
    /// Color for values without an assignment
    pub fallback: String,
    /// Fixed colors keyed by sequencing status label
    pub status: BTreeMap<String, String>,
    /// Fixed colors keyed by source label
    pub source: BTreeMap<String, String>,
}

impl Default for Palette {
    fn default() -> Self {
        let status = [
            (SequencingStatus::Sequenced, "#10b981"),
            (SequencingStatus::TissueAvailable, "#3b82f6"),
            (SequencingStatus::PreservedSpecimen, "#f59e0b"),
            (SequencingStatus::Published, "#a855f7"),
            (SequencingStatus::GbifRecord, "#6b7280"),
        ];
        let source = [
            (Source::Dore, "#8b5cf6"),
            (Source::Sanger, "#0ea5e9"),
            (Source::Gbif, "#22c55e"),
        ];

        Self {
            saturation: 70,
            lightness: 50,
            fallback: "#9ca3af".to_string(),
            status: status.iter().map(|(s, c)| (s.label().to_string(), c.to_string())).collect(),
            source: source.iter().map(|(s, c)| (s.label().to_string(), c.to_string())).collect(),
        }
    }
}

impl Palette {
    /// Fixed lookup table for a field, `None` for generated fields
    fn table(&self, field: Field) -> Option<&BTreeMap<String, String>> {
        match field {
            Field::SequencingStatus => Some(&self.status),
            Field::Source => Some(&self.source),
            Field::Genus | Field::Species | Field::Subspecies | Field::MimicryRing | Field::Country => None,
        }
    }

    /// Hues are rounded to six decimals, which keeps up to 360 million
    /// values apart
    fn hsl(&self, hue: f64) -> String {
        let hue = (hue * 1e6).round() / 1e6;
        format!("hsl({}, {}%, {}%)", hue, self.saturation, self.lightness)
    }
}

/// Value → color for one field
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    field: Option<Field>,
    colors: BTreeMap<String, String>,
    fallback: String,
}

impl ColorMap {
    /// A map with no entries; every lookup yields the fallback
    pub fn empty(fallback: &str) -> Self {
        Self {
            field: None,
            colors: BTreeMap::new(),
            fallback: fallback.to_string(),
        }
    }

    pub fn field(&self) -> Option<Field> {
        self.field
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Color for a value; absent or unmapped values get the fallback
    pub fn get(&self, value: Option<&str>) -> &str {
        value
            .and_then(|v| self.colors.get(v))
            .map_or(self.fallback.as_str(), String::as_str)
    }

    /// Color for a record under this map's field
    pub fn color_for(&self, record: &Record) -> &str {
        match self.field {
            Some(field) => self.get(field.value(record)),
            None => &self.fallback,
        }
    }

    /// Entries in sorted value order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors.iter().map(|(v, c)| (v.as_str(), c.as_str()))
    }

    /// Data-driven paint expression for the map renderer:
    /// `["match", ["get", key], v1, c1, ..., fallback]`.
    /// With no entries the expression is just the fallback color.
    pub fn paint_expression(&self) -> serde_json::Value {
        let Some(field) = self.field.filter(|_| !self.colors.is_empty()) else {
            return serde_json::Value::String(self.fallback.clone());
        };

        let mut expr = vec![
            serde_json::json!("match"),
            serde_json::json!(["get", field.name()]),
        ];
        for (value, color) in &self.colors {
            expr.push(serde_json::json!(value));
            expr.push(serde_json::json!(color));
        }
        expr.push(serde_json::json!(self.fallback));
        serde_json::Value::Array(expr)
    }
}

/// Assign one color to each distinct value of `field`.
///
/// Duplicates are coalesced. Fixed-palette fields look values up (unknown
/// values get the fallback); other fields spread hues evenly over the
/// lexicographically sorted values.
pub fn assign_colors<'a, I>(values: I, field: Field, palette: &Palette) -> ColorMap
where
    I: IntoIterator<Item = &'a str>,
{
    let distinct: BTreeSet<&str> = values.into_iter().collect();
    let total = distinct.len();

    let colors: BTreeMap<String, String> = match palette.table(field) {
        Some(table) => distinct
            .into_iter()
            .map(|v| {
                let color = table.get(v).unwrap_or(&palette.fallback);
                (v.to_string(), color.clone())
            })
            .collect(),
        None => distinct
            .into_iter()
            .enumerate()
            .map(|(i, v)| (v.to_string(), palette.hsl(i as f64 * 360.0 / total as f64)))
            .collect(),
    };

    tracing::debug!(field = %field, values = colors.len(), "Assigned colors");
    ColorMap {
        field: Some(field),
        colors,
        fallback: palette.fallback.clone(),
    }
}

/// Same as [`assign_colors`] for a field given by name; an unknown name
/// yields an empty map rather than an error.
pub fn assign_colors_by_name<'a, I>(values: I, field: &str, palette: &Palette) -> ColorMap
where
    I: IntoIterator<Item = &'a str>,
{
    match field.parse::<Field>() {
        Ok(field) => assign_colors(values, field, palette),
        Err(e) => {
            tracing::warn!("Cannot color by '{}': {}", field, e);
            ColorMap::empty(&palette.fallback)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Legend entries plus the size of the map they were cut from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub total: usize,
}

impl Legend {
    /// How many values did not fit
    pub fn more(&self) -> usize {
        self.total.saturating_sub(self.entries.len())
    }

    /// "+N more" when truncated
    pub fn more_label(&self) -> Option<String> {
        let more = self.more();
        (more > 0).then(|| format!("+{} more", more))
    }
}

/// First `max_items` entries of `colors`, in assignment order
pub fn build_legend(colors: &ColorMap, max_items: usize) -> Legend {
    Legend {
        entries: colors
            .iter()
            .take(max_items)
            .map(|(label, color)| LegendEntry {
                label: label.to_string(),
                color: color.to_string(),
            })
            .collect(),
        total: colors.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::record;

    #[test]
    fn test_three_species_spread_evenly() {
        let palette = Palette::default();
        let map = assign_colors(["y", "x", "z"], Field::Species, &palette);
        let colors: Vec<_> = map.iter().collect();
        assert_eq!(
            colors,
            vec![
                ("x", "hsl(0, 70%, 50%)"),
                ("y", "hsl(120, 70%, 50%)"),
                ("z", "hsl(240, 70%, 50%)"),
            ]
        );
    }

    #[test]
    fn test_large_value_sets_keep_distinct_colors() {
        let names: Vec<String> = (0..5000).map(|i| format!("ssp{:05}", i)).collect();
        let colors = assign_colors(names.iter().map(String::as_str), Field::Subspecies, &Palette::default());
        let distinct: BTreeSet<&str> = colors.iter().map(|(_, c)| c).collect();
        assert_eq!(colors.len(), 5000);
        assert_eq!(distinct.len(), 5000);
        assert_eq!(colors.get(Some("ssp00001")), "hsl(0.072, 70%, 50%)");
    }

    #[test]
    fn test_assignment_ignores_order_and_duplicates() {
        let palette = Palette::default();
        let a = assign_colors(["Tiger", "Hermias", "Mamercus", "Tiger"], Field::MimicryRing, &palette);
        let b = assign_colors(["Mamercus", "Tiger", "Hermias"], Field::MimicryRing, &palette);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_fixed_palette_and_fallback() {
        let palette = Palette::default();
        let map = assign_colors(["Sequenced", "Lost in transit"], Field::SequencingStatus, &palette);
        assert_eq!(map.get(Some("Sequenced")), "#10b981");
        assert_eq!(map.get(Some("Lost in transit")), palette.fallback);
        assert_eq!(map.get(Some("Published")), palette.fallback);
        assert_eq!(map.get(None), palette.fallback);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_unknown_field_name_gives_empty_map() {
        let palette = Palette::default();
        let map = assign_colors_by_name(["a"], "wingspan", &palette);
        assert!(map.is_empty());
        assert!(build_legend(&map, 10).entries.is_empty());
        assert_eq!(map.paint_expression(), serde_json::json!("#9ca3af"));
    }

    #[test]
    fn test_no_values_no_colors() {
        let map = assign_colors(std::iter::empty(), Field::Genus, &Palette::default());
        assert!(map.is_empty());
        let legend = build_legend(&map, 5);
        assert!(legend.entries.is_empty());
        assert_eq!(legend.more_label(), None);
    }

    #[test]
    fn test_legend_truncation() {
        let names: Vec<String> = (0..15).map(|i| format!("species{:02}", i)).collect();
        let map = assign_colors(names.iter().map(String::as_str), Field::Species, &Palette::default());
        let legend = build_legend(&map, 10);
        assert_eq!(legend.entries.len(), 10);
        assert_eq!(legend.more(), 5);
        assert_eq!(legend.more_label().as_deref(), Some("+5 more"));
        assert_eq!(legend.entries[0].label, "species00");

        let all = build_legend(&map, 20);
        assert_eq!(all.entries.len(), 15);
        assert_eq!(all.more(), 0);
    }

    #[test]
    fn test_record_color_by_field() {
        let palette = Palette::default();
        let map = assign_colors(["Dore et al. (2025)"], Field::Source, &palette);
        let r = record("DORE_7", "Napeogenes", "inachia");
        assert_eq!(map.color_for(&r), "#8b5cf6");
    }

    #[test]
    fn test_paint_expression_shape() {
        let map = assign_colors(["b", "a"], Field::Genus, &Palette::default());
        assert_eq!(
            map.paint_expression(),
            serde_json::json!([
                "match",
                ["get", "genus"],
                "a", "hsl(0, 70%, 50%)",
                "b", "hsl(180, 70%, 50%)",
                "#9ca3af"
            ])
        );
    }
}
