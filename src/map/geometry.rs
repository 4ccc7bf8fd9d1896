//! Trail geometry records, read from a GeoJSON export of the trails shapefile.

use crate::error::TrailSheetError;
use crate::progress::TrailAttributes;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Separator between tab and trail name in a composite identifier.
const ID_SEPARATOR: &str = ", ";

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("Alternate identifier '{alt_id}' is used by both '{first}' and '{second}'")]
    DuplicateAlternateId {
        alt_id: String,
        first: String,
        second: String,
    },

    #[error("Feature {0} has no 'Trail_ID' property")]
    MissingTrailIdError(usize),

    #[error("Trail '{0}' has a coordinate with fewer than two values")]
    CoordinateError(String),
}

/// One trail from the geometry source. Paths hold (lat, lng) pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailGeometry {
    pub trail_id: String,
    pub alt_id: Option<String>,
    pub paths: Vec<Vec<(f64, f64)>>,
    /// Filled in by reconciliation
    pub attributes: Option<TrailAttributes>,
}

impl TrailGeometry {
    pub fn new(trail_id: &str, alt_id: Option<&str>, paths: Vec<Vec<(f64, f64)>>) -> Self {
        TrailGeometry {
            trail_id: trail_id.to_owned(),
            alt_id: alt_id.filter(|id| !id.is_empty()).map(str::to_owned),
            paths,
            attributes: None,
        }
    }

    /// Tab part of the identifier; empty when the identifier has no separator.
    pub fn tab(&self) -> &str {
        self.trail_id
            .split_once(ID_SEPARATOR)
            .map(|(tab, _)| tab)
            .unwrap_or_default()
    }

    /// Trail name part of the identifier; the whole identifier when it has no separator.
    pub fn trail_name(&self) -> &str {
        self.trail_id
            .split_once(ID_SEPARATOR)
            .map(|(_, name)| name)
            .unwrap_or(&self.trail_id)
    }
}

/// Geometry records indexed by primary identifier and by alternate identifier.
#[derive(Clone, Debug, Default)]
pub struct GeometrySet {
    records: IndexMap<String, TrailGeometry>,
    /// Alternate identifier to primary identifier
    alt_ids: HashMap<String, String>,
}

impl GeometrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record. A repeated primary identifier replaces the earlier record; an
    /// alternate identifier already owned by another trail is an error.
    pub fn insert(&mut self, record: TrailGeometry) -> Result<(), GeometryError> {
        if let Some(alt_id) = &record.alt_id {
            if let Some(owner) = self.alt_ids.get(alt_id).filter(|owner| **owner != record.trail_id) {
                Err(GeometryError::DuplicateAlternateId {
                    alt_id: alt_id.to_owned(),
                    first: owner.to_owned(),
                    second: record.trail_id.to_owned(),
                })?
            }
        }

        if let Some(previous) = self.records.get_mut(&record.trail_id).and_then(|previous| previous.alt_id.take()) {
            self.alt_ids.remove(&previous);
        }
        if let Some(alt_id) = &record.alt_id {
            self.alt_ids.insert(alt_id.to_owned(), record.trail_id.to_owned());
        }
        self.records.insert(record.trail_id.to_owned(), record);
        Ok(())
    }

    pub fn from_geojson_str(json: &str) -> Result<Self, TrailSheetError> {
        Self::from_collection(serde_json::from_str(json)?)
    }

    pub fn from_geojson_path<P: AsRef<Path>>(path: P) -> Result<Self, TrailSheetError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let geometry = Self::from_collection(serde_json::from_reader(reader)?)?;
        debug!(path = %path.as_ref().display(), trails = geometry.len(), alternates = geometry.alt_ids.len(), "loaded trail geometry");
        Ok(geometry)
    }

    fn from_collection(collection: FeatureCollection) -> Result<Self, TrailSheetError> {
        let mut geometry = GeometrySet::new();
        for (position, feature) in collection.features.into_iter().enumerate() {
            let trail_id = feature
                .properties
                .trail_id
                .ok_or(GeometryError::MissingTrailIdError(position))?;
            let paths = match feature.geometry {
                Some(FeatureGeometry::LineString(line)) => vec![to_path(&trail_id, line)?],
                Some(FeatureGeometry::MultiLineString(lines)) => lines
                    .into_iter()
                    .map(|line| to_path(&trail_id, line))
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            geometry.insert(TrailGeometry::new(&trail_id, feature.properties.alt_id.as_deref(), paths))?;
        }
        Ok(geometry)
    }

    pub fn get(&self, trail_id: &str) -> Option<&TrailGeometry> {
        self.records.get(trail_id)
    }

    pub fn get_mut(&mut self, trail_id: &str) -> Option<&mut TrailGeometry> {
        self.records.get_mut(trail_id)
    }

    pub fn contains(&self, trail_id: &str) -> bool {
        self.records.contains_key(trail_id)
    }

    /// Primary identifier owning an alternate identifier.
    pub fn resolve_alternate(&self, alt_id: &str) -> Option<&str> {
        self.alt_ids.get(alt_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailGeometry> {
        self.records.values()
    }
}

/// GeoJSON positions are `[lng, lat]` with an optional elevation; stored as (lat, lng).
fn to_path(trail_id: &str, line: Vec<Vec<f64>>) -> Result<Vec<(f64, f64)>, GeometryError> {
    line.into_iter()
        .map(|position| match position[..] {
            [lng, lat, ..] => Ok((lat, lng)),
            _ => Err(GeometryError::CoordinateError(trail_id.to_owned())),
        })
        .collect()
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: Option<FeatureGeometry>,
}

#[derive(Deserialize)]
struct FeatureProperties {
    #[serde(rename = "Trail_ID", default)]
    trail_id: Option<String>,
    #[serde(rename = "Alt_ID", default)]
    alt_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum FeatureGeometry {
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
}
