//! Validated geographic coordinates.

use geo::Point;
use std::fmt;

use crate::error::CoordinateError;
use crate::models::PointInPolygonRequest;

pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// A longitude/latitude pair known to be within range.
///
/// The only way to obtain one is through [`Coordinate::new`], so holding a
/// `Coordinate` means the bounds check already passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lon: f64,
    lat: f64,
}

impl Coordinate {
    /// Validate a raw pair. Bounds are inclusive; NaN is rejected.
    pub fn new(lon: f64, lat: f64) -> Result<Self, CoordinateError> {
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordinateError::Longitude(lon));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        Ok(Self { lon, lat })
    }

    pub fn longitude(&self) -> f64 {
        self.lon
    }

    pub fn latitude(&self) -> f64 {
        self.lat
    }

    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl TryFrom<&PointInPolygonRequest> for Coordinate {
    type Error = CoordinateError;

    fn try_from(req: &PointInPolygonRequest) -> Result<Self, Self::Error> {
        Coordinate::new(req.longitude, req.latitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}
