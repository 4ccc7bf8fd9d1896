//! GeoJSON layer document handed to a map renderer, and the plain-text report of
//! trails that could not be drawn.

use crate::config::ExpectedTabs;
use crate::error::TrailSheetError;
use crate::map::geometry::GeometrySet;
use crate::map::geometry::TrailGeometry;
use crate::map::peaks::Peak;
use crate::map::reconcile::Reconciliation;
use crate::spreadsheet::CellValue;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

pub const TRAILS_LAYER: &str = "Trails";
pub const PEAKS_LAYER: &str = "4000 Footers";
pub const TRACED_COLOR: &str = "red";
pub const REMAINING_COLOR: &str = "blue";

const REPORT_HEADER: &str = "The geometry of the following trails is unavailable and could not be drawn:";
const REPORT_COLUMNS: &str = "    (Tab, Trail Name)";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct MapLayers {
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

/// Positions are written in GeoJSON order, `[lng, lat]`.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    MultiLineString(Vec<Vec<[f64; 2]>>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Properties {
    Trail(TrailProperties),
    Peak(PeakProperties),
}

#[derive(Debug, Serialize)]
pub struct TrailProperties {
    pub layer: &'static str,
    pub trail_name: String,
    pub section: String,
    pub tab: String,
    pub mileage: CellValue,
    pub miles_todo: CellValue,
    pub traced: bool,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PeakProperties {
    pub layer: &'static str,
    pub name: String,
    pub elevation: String,
    pub tooltip: String,
}

impl MapLayers {
    /// One trail feature per drawable trail, in drawing order, followed by one point
    /// per peak.
    pub fn build(
        geometry: &GeometrySet,
        reconciliation: &Reconciliation,
        expected_tabs: &ExpectedTabs,
        peaks: &[Peak],
    ) -> MapLayers {
        let trails = reconciliation
            .to_draw
            .iter()
            .filter_map(|trail_id| geometry.get(trail_id))
            .map(|trail| trail_feature(trail, expected_tabs));
        let peaks = peaks.iter().map(peak_feature);
        MapLayers {
            features: trails.chain(peaks).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, TrailSheetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), TrailSheetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

fn trail_feature(trail: &TrailGeometry, expected_tabs: &ExpectedTabs) -> Feature {
    let attributes = trail.attributes.clone().unwrap_or_default();
    let traced = attributes.is_traced();
    let tab = trail.tab();
    let mut lines: Vec<Vec<[f64; 2]>> = trail
        .paths
        .iter()
        .map(|path| path.iter().map(|(lat, lng)| [*lng, *lat]).collect())
        .collect();
    let geometry = if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(lines)
    };

    Feature {
        geometry,
        properties: Properties::Trail(TrailProperties {
            layer: TRAILS_LAYER,
            trail_name: trail.trail_name().to_owned(),
            section: expected_tabs.section(tab).unwrap_or(tab).to_owned(),
            tab: tab.to_owned(),
            mileage: attributes.mileage,
            miles_todo: attributes.miles_todo,
            traced,
            color: if traced { TRACED_COLOR } else { REMAINING_COLOR },
        }),
    }
}

fn peak_feature(peak: &Peak) -> Feature {
    Feature {
        geometry: Geometry::Point([peak.longitude, peak.latitude]),
        properties: Properties::Peak(PeakProperties {
            layer: PEAKS_LAYER,
            name: peak.name.to_owned(),
            elevation: peak.elevation.to_owned(),
            tooltip: peak.tooltip(),
        }),
    }
}

/// Enumerated, 1-indexed list of trails that exist in the workbook but have no
/// geometry. `None` when every trail could be drawn.
pub fn without_geometry_report(trail_ids: &[String]) -> Option<String> {
    if trail_ids.is_empty() {
        return None;
    }
    let mut lines = vec![REPORT_HEADER.to_owned(), REPORT_COLUMNS.to_owned()];
    lines.extend(
        trail_ids
            .iter()
            .enumerate()
            .map(|(index, trail_id)| format!("{}.    {}", index + 1, trail_id)),
    );
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::TrailAttributes;
    use serde_json::json;

    fn drawn(trail_id: &str, todo: CellValue, paths: Vec<Vec<(f64, f64)>>) -> TrailGeometry {
        let mut trail = TrailGeometry::new(trail_id, None, paths);
        trail.attributes = Some(TrailAttributes {
            mileage: CellValue::Number(2.9),
            miles_todo: todo,
        });
        trail
    }

    #[test]
    fn colors_trails_by_remaining_mileage() {
        let mut geometry = GeometrySet::new();
        geometry.insert(drawn("Pemigewasset, Lincoln Woods Trail", CellValue::Number(0.0), vec![vec![(44.06, -71.59), (44.08, -71.57)]])).unwrap();
        geometry.insert(drawn("Unlisted, Wilderness Trail", CellValue::Number(1.5), vec![vec![(1.0, 2.0)], vec![(3.0, 4.0)]])).unwrap();
        let reconciliation = Reconciliation {
            to_draw: vec!["Pemigewasset, Lincoln Woods Trail".to_owned(), "Unlisted, Wilderness Trail".to_owned()],
            ..Default::default()
        };
        let expected = ExpectedTabs::new([("Pemigewasset", "Franconia, Twin, and Willey Ranges")]);
        let peaks = vec![Peak {
            name: "Mount Washington".to_owned(),
            elevation: "6288".to_owned(),
            latitude: 44.2705,
            longitude: -71.3033,
        }];

        let layers = MapLayers::build(&geometry, &reconciliation, &expected, &peaks);
        let value = serde_json::to_value(&layers).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 3);

        let traced = &value["features"][0];
        assert_eq!(
            traced,
            &json!({
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[-71.59, 44.06], [-71.57, 44.08]]},
                "properties": {
                    "layer": "Trails",
                    "trail_name": "Lincoln Woods Trail",
                    "section": "Franconia, Twin, and Willey Ranges",
                    "tab": "Pemigewasset",
                    "mileage": 2.9,
                    "miles_todo": 0.0,
                    "traced": true,
                    "color": "red"
                }
            })
        );

        let remaining = &value["features"][1];
        assert_eq!(remaining["geometry"]["type"], "MultiLineString");
        assert_eq!(remaining["properties"]["section"], "Unlisted");
        assert_eq!(remaining["properties"]["color"], "blue");

        let peak = &value["features"][2];
        assert_eq!(peak["geometry"], json!({"type": "Point", "coordinates": [-71.3033, 44.2705]}));
        assert_eq!(peak["properties"]["layer"], "4000 Footers");
        assert_eq!(peak["properties"]["tooltip"], "Mount Washington (6288 ft)");
    }

    #[test]
    fn non_numeric_todo_is_not_traced() {
        let mut geometry = GeometrySet::new();
        geometry.insert(drawn("Zealand, Ethan Pond Trail", CellValue::Text("0".to_owned()), vec![vec![(1.0, 2.0)]])).unwrap();
        let reconciliation = Reconciliation {
            to_draw: vec!["Zealand, Ethan Pond Trail".to_owned()],
            ..Default::default()
        };
        let layers = MapLayers::build(&geometry, &reconciliation, &ExpectedTabs::default(), &[]);
        let value = serde_json::to_value(&layers).unwrap();
        assert_eq!(value["features"][0]["properties"]["color"], "blue");
        assert_eq!(value["features"][0]["properties"]["miles_todo"], "0");
    }

    #[test]
    fn writes_layer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.geojson");
        let layers = MapLayers::build(&GeometrySet::new(), &Reconciliation::default(), &ExpectedTabs::default(), &[]);
        layers.write_to(&path).unwrap();
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"type": "FeatureCollection", "features": []}));
        let rendered: serde_json::Value = serde_json::from_str(&layers.to_json().unwrap()).unwrap();
        assert_eq!(rendered, written);
    }

    #[test]
    fn renders_enumerated_report() {
        let ids = vec!["Carter-Moriah, Stony Brook Trail".to_owned(), "Mahoosucs, Success Trail".to_owned()];
        assert_eq!(
            without_geometry_report(&ids).unwrap(),
            "The geometry of the following trails is unavailable and could not be drawn:\n    (Tab, Trail Name)\n1.    Carter-Moriah, Stony Brook Trail\n2.    Mahoosucs, Success Trail"
        );
        assert_eq!(without_geometry_report(&[]), None);
    }
}
