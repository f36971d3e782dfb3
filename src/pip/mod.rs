//! Point-in-Polygon (PIP) request pipeline stages.
//!
//! Validates coordinates, turns request options into query filters and
//! runs the lookup against a shared spatial database.

mod client;
mod coordinate;
mod filter;

pub use client::{QueryContext, SpatialQueryClient};
pub use coordinate::{Coordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use filter::{GeometrySelection, QueryFilter};
