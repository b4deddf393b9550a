//! Export of the visible records
//!
//! - GeoJSON `FeatureCollection` with a `color` property per feature
//! - JSON array in the same shape as `map_points.json`
//! - compact `{id, lat, lng, color}` points for the map layer

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::color::ColorMap;
use crate::view::{map_points, DerivedView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Geojson,
    Json,
    Points,
}

/// Visible records as a GeoJSON feature collection
pub fn to_geojson(view: &DerivedView<'_>, colors: &ColorMap) -> Result<Value> {
    let mut features = Vec::with_capacity(view.filtered.len());
    for record in &view.filtered {
        let mut properties = serde_json::to_value(record)?;
        if let Value::Object(map) = &mut properties {
            map.insert("color".to_string(), json!(colors.color_for(record)));
        }
        features.push(json!({
            "type": "Feature",
            "id": record.id,
            "geometry": { "type": "Point", "coordinates": [record.lng, record.lat] },
            "properties": properties,
        }));
    }

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

/// Write the visible records to `path`, returning how many were written
pub fn write_export<P: AsRef<Path>>(
    path: P,
    format: ExportFormat,
    view: &DerivedView<'_>,
    colors: &ColorMap,
) -> Result<usize> {
    let path = path.as_ref();
    let document = match format {
        ExportFormat::Geojson => to_geojson(view, colors)?,
        ExportFormat::Json => serde_json::to_value(&view.filtered)?,
        ExportFormat::Points => serde_json::to_value(map_points(view, colors))?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(&document)?)
        .with_context(|| format!("writing export to {:?}", path))?;

    tracing::info!("Exported {} records as {:?} to {:?}", view.count, format, path);
    Ok(view.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{assign_colors, Palette};
    use crate::filter::FilterState;
    use crate::records::fixtures::{dated, record};
    use crate::records::{Field, Record};
    use crate::view::{build, ViewSpec};

    fn records() -> Vec<Record> {
        let mut a = dated("CAM1", "polymnia", Some("2020-03-04"));
        a.lat = 4.5;
        a.lng = -74.1;
        vec![a, record("CAM2", "Melinaea", "menophilus")]
    }

    #[test]
    fn test_geojson_features() {
        let records = records();
        let view = build(&records, &FilterState::from_query("species=polymnia"), &ViewSpec::default());
        let colors = assign_colors(view.color_values(Field::Species), Field::Species, &Palette::default());
        let doc = to_geojson(&view, &colors).unwrap();

        assert_eq!(doc["type"], "FeatureCollection");
        let features = doc["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([-74.1, 4.5]));
        assert_eq!(features[0]["properties"]["color"], "hsl(0, 70%, 50%)");
        assert_eq!(features[0]["properties"]["observation_date"], "2020-03-04");
        assert_eq!(features[0]["properties"]["sequencing_status"], "Published");
    }

    #[test]
    fn test_points_export() {
        let records = records();
        let view = build(&records, &FilterState::default(), &ViewSpec::default());
        let colors = assign_colors(view.color_values(Field::Genus), Field::Genus, &Palette::default());
        let file = tempfile::NamedTempFile::new().unwrap();

        write_export(file.path(), ExportFormat::Points, &view, &colors).unwrap();
        let points: Value = serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(
            points,
            json!([
                {"id": "CAM1", "lat": 4.5, "lng": -74.1, "color": "hsl(0, 70%, 50%)"},
                {"id": "CAM2", "lat": -3.75, "lng": -73.25, "color": "hsl(180, 70%, 50%)"}
            ])
        );
    }

    #[test]
    fn test_json_export_round_trips_through_loader() {
        let records = records();
        let view = build(&records, &FilterState::default(), &ViewSpec::default());
        let colors = ColorMap::empty("#000000");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("visible.json");

        let written = write_export(&path, ExportFormat::Json, &view, &colors).unwrap();
        assert_eq!(written, 2);

        let report = crate::records::loader::load_records(&path).unwrap();
        assert_eq!(report.records, records);
    }
}
