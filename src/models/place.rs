//! Standard place records returned by point-in-polygon lookups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Placetype;

/// Tri-state existential flag: unknown (-1), false (0) or true (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Existential {
    #[default]
    Unknown,
    False,
    True,
}

impl Existential {
    pub fn as_i64(self) -> i64 {
        match self {
            Existential::Unknown => -1,
            Existential::False => 0,
            Existential::True => 1,
        }
    }
}

impl TryFrom<i64> for Existential {
    type Error = InvalidExistential;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Existential::Unknown),
            0 => Ok(Existential::False),
            1 => Ok(Existential::True),
            other => Err(InvalidExistential(other)),
        }
    }
}

impl From<Existential> for i64 {
    fn from(flag: Existential) -> Self {
        flag.as_i64()
    }
}

/// An existential flag value outside {-1, 0, 1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("existential flag must be -1, 0 or 1, got {0}")]
pub struct InvalidExistential(pub i64);

impl fmt::Display for Existential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Bounding box as `[min_lon, min_lat, max_lon, max_lat]`
pub type GeoBbox = [f64; 4];

/// A single place matched by a point-in-polygon lookup.
///
/// Field declaration order is the serialized key order, which keeps encoded
/// responses byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    #[serde(rename = "wof:id")]
    pub id: i64,

    #[serde(rename = "wof:parent_id", default = "unknown_id")]
    pub parent_id: i64,

    #[serde(rename = "wof:name", default)]
    pub name: String,

    #[serde(rename = "wof:placetype")]
    pub placetype: Placetype,

    #[serde(rename = "wof:country", default)]
    pub country: String,

    #[serde(rename = "wof:repo", default)]
    pub repo: String,

    /// Relative path of the source record, e.g. "101/748/417/101748417.geojson"
    #[serde(rename = "wof:path", default)]
    pub path: String,

    #[serde(rename = "wof:is_alt", default)]
    pub is_alt: bool,

    #[serde(
        rename = "wof:alt_label",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alt_label: Option<String>,

    #[serde(rename = "geom:latitude", default)]
    pub latitude: f64,

    #[serde(rename = "geom:longitude", default)]
    pub longitude: f64,

    #[serde(rename = "geom:bbox", default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<GeoBbox>,

    #[serde(rename = "mz:is_current", default)]
    pub is_current: Existential,

    #[serde(rename = "mz:is_ceased", default)]
    pub is_ceased: Existential,

    #[serde(rename = "mz:is_deprecated", default)]
    pub is_deprecated: Existential,

    #[serde(rename = "mz:is_superseded", default)]
    pub is_superseded: Existential,

    #[serde(rename = "mz:is_superseding", default)]
    pub is_superseding: Existential,

    #[serde(rename = "wof:lastmodified", default)]
    pub last_modified: i64,

    /// Extra properties projected on request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

fn unknown_id() -> i64 {
    -1
}

impl PlaceRecord {
    /// Create a record with minimal required fields
    pub fn new(id: i64, name: &str, placetype: Placetype) -> Self {
        Self {
            id,
            parent_id: unknown_id(),
            name: name.to_string(),
            placetype,
            country: String::new(),
            repo: String::new(),
            path: wof_path(id),
            is_alt: false,
            alt_label: None,
            latitude: 0.0,
            longitude: 0.0,
            bbox: None,
            is_current: Existential::Unknown,
            is_ceased: Existential::Unknown,
            is_deprecated: Existential::Unknown,
            is_superseded: Existential::Unknown,
            is_superseding: Existential::Unknown,
            last_modified: 0,
            properties: BTreeMap::new(),
        }
    }
}

/// Build the conventional relative path for a record id.
///
/// The id's digits are split into groups of three to form directories, so
/// `101748417` becomes `101/748/417/101748417.geojson`.
pub fn wof_path(id: i64) -> String {
    let digits = id.to_string();
    if id < 0 {
        return format!("{}.geojson", digits);
    }

    let dirs: Vec<String> = digits
        .as_bytes()
        .chunks(3)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    format!("{}/{}.geojson", dirs.join("/"), digits)
}
