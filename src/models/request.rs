//! Decoded point-in-polygon request.

use serde::{Deserialize, Serialize};

/// A point-in-polygon request as sent by the host.
///
/// Only `longitude` and `latitude` are required. Unknown keys are ignored.
/// Range checks happen later, in [`crate::pip::Coordinate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointInPolygonRequest {
    pub longitude: f64,
    pub latitude: f64,

    /// Allow-list of placetype names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placetypes: Option<Vec<String>>,

    /// Placetype names removed from the allow-list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_placetypes: Option<Vec<String>>,

    /// Extra properties to project into each result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,

    /// Match alternate geometries instead of default ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_alt: Option<bool>,

    /// Geometry selection: "all", "default" or "alternate"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometries: Option<String>,

    /// Alt labels to restrict alternate geometries to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_geometries: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_current: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ceased: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deprecated: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superseded: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superseding: Option<Vec<i64>>,
}

impl PointInPolygonRequest {
    /// Create a request for a bare coordinate with no filters
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            placetypes: None,
            exclude_placetypes: None,
            properties: None,
            is_alt: None,
            geometries: None,
            alternate_geometries: None,
            is_current: None,
            is_ceased: None,
            is_deprecated: None,
            is_superseded: None,
            is_superseding: None,
        }
    }
}
