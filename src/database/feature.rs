//! Place features loaded from GeoJSON.

use geo::{BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::DatabaseError;
use crate::models::place::wof_path;
use crate::models::{Existential, PlaceRecord, Placetype};

/// A place polygon with its record and raw properties
#[derive(Debug, Clone)]
pub struct SpatialFeature {
    pub record: PlaceRecord,
    pub geometry: MultiPolygon<f64>,
    properties: Map<String, Value>,
}

impl SpatialFeature {
    pub fn new(record: PlaceRecord, geometry: MultiPolygon<f64>) -> Self {
        Self {
            record,
            geometry,
            properties: Map::new(),
        }
    }

    /// Get the bounding box of this feature
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Copy requested raw properties onto a record.
    ///
    /// A trailing `*` selects every property sharing the prefix. Properties
    /// the feature does not carry are left out.
    pub fn project(&self, record: &mut PlaceRecord, names: &[String]) {
        for name in names {
            match name.strip_suffix('*') {
                Some(prefix) => {
                    for (key, value) in self.properties.iter() {
                        if key.starts_with(prefix) {
                            record.properties.insert(key.clone(), value.clone());
                        }
                    }
                }
                None => {
                    if let Some(value) = self.properties.get(name) {
                        record.properties.insert(name.clone(), value.clone());
                    }
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// Parse a GeoJSON `FeatureCollection` of place polygons.
///
/// Every feature needs a `wof:id`, a known `wof:placetype` and a `Polygon` or
/// `MultiPolygon` geometry.
pub fn parse_feature_collection(json: &str) -> Result<Vec<SpatialFeature>, DatabaseError> {
    let collection: FeatureCollection = serde_json::from_str(json)?;

    if collection.kind != "FeatureCollection" {
        return Err(DatabaseError::InvalidFeature {
            index: 0,
            reason: format!("expected a FeatureCollection, found '{}'", collection.kind),
        });
    }

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            to_spatial_feature(feature)
                .map_err(|reason| DatabaseError::InvalidFeature { index, reason })
        })
        .collect()
}

fn to_spatial_feature(feature: Feature) -> Result<SpatialFeature, String> {
    let geometry = match feature.geometry {
        Some(Geometry::Polygon { coordinates }) => {
            MultiPolygon::new(vec![to_polygon(coordinates)?])
        }
        Some(Geometry::MultiPolygon { coordinates }) => MultiPolygon::new(
            coordinates
                .into_iter()
                .map(to_polygon)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(Geometry::Unsupported) => return Err("unsupported geometry type".to_string()),
        None => return Err("missing geometry".to_string()),
    };

    let props = feature.properties;

    let id = props
        .get("wof:id")
        .and_then(Value::as_i64)
        .ok_or("missing or non-integer wof:id")?;

    let placetype: Placetype = props
        .get("wof:placetype")
        .and_then(Value::as_str)
        .ok_or("missing wof:placetype")?
        .parse::<Placetype>()
        .map_err(|e| format!("{}", e))?;

    let name = str_prop(&props, "wof:name").unwrap_or_default();
    let mut record = PlaceRecord::new(id, &name, placetype);

    if let Some(parent_id) = props.get("wof:parent_id").and_then(Value::as_i64) {
        record.parent_id = parent_id;
    }
    record.country = str_prop(&props, "wof:country").unwrap_or_default();
    record.repo = str_prop(&props, "wof:repo").unwrap_or_default();
    record.path = str_prop(&props, "wof:path").unwrap_or_else(|| wof_path(id));

    record.alt_label =
        str_prop(&props, "src:alt_label").or_else(|| str_prop(&props, "wof:alt_label"));
    record.is_alt = props
        .get("wof:is_alt")
        .and_then(Value::as_bool)
        .unwrap_or(record.alt_label.is_some());

    let centroid = geometry.centroid();
    record.latitude = props
        .get("geom:latitude")
        .and_then(Value::as_f64)
        .or_else(|| centroid.map(|p| p.y()))
        .unwrap_or_default();
    record.longitude = props
        .get("geom:longitude")
        .and_then(Value::as_f64)
        .or_else(|| centroid.map(|p| p.x()))
        .unwrap_or_default();

    record.bbox = geometry
        .bounding_rect()
        .map(|rect| [rect.min().x, rect.min().y, rect.max().x, rect.max().y]);

    record.is_current = existential_prop(&props, "mz:is_current")?;
    record.is_ceased = existential_prop(&props, "mz:is_ceased")?;
    record.is_deprecated = existential_prop(&props, "mz:is_deprecated")?;
    record.is_superseded = existential_prop(&props, "mz:is_superseded")?;
    record.is_superseding = existential_prop(&props, "mz:is_superseding")?;

    record.last_modified = props
        .get("wof:lastmodified")
        .and_then(Value::as_i64)
        .unwrap_or_default();

    debug!("Loaded {} {} ({})", placetype, id, name);

    Ok(SpatialFeature {
        record,
        geometry,
        properties: props,
    })
}

fn to_polygon(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, String> {
    let mut rings = rings.into_iter().map(to_ring);

    let exterior = rings.next().ok_or("polygon without rings")??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: Vec<Vec<f64>>) -> Result<LineString<f64>, String> {
    let coords = positions
        .iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("position with {} values", pos.len())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if coords.len() < 4 {
        return Err(format!("ring with {} positions, need at least 4", coords.len()));
    }

    // LineString::new does not close rings, Polygon::new does
    Ok(LineString::new(coords))
}

fn str_prop(props: &Map<String, Value>, key: &str) -> Option<String> {
    props.get(key).and_then(Value::as_str).map(str::to_string)
}

fn existential_prop(props: &Map<String, Value>, key: &str) -> Result<Existential, String> {
    match props.get(key).and_then(Value::as_i64) {
        Some(v) => Existential::try_from(v).map_err(|e| format!("{}: {}", key, e)),
        None => Ok(Existential::Unknown),
    }
}

/// Group feature counts by placetype, for index statistics
pub(super) fn count_by_placetype(features: &[SpatialFeature]) -> BTreeMap<Placetype, usize> {
    let mut counts = BTreeMap::new();
    for feature in features {
        *counts.entry(feature.record.placetype).or_insert(0) += 1;
    }
    counts
}
