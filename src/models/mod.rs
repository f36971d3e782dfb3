//! Core data models for point-in-polygon lookups.

pub mod place;
pub mod placetype;
pub mod request;

pub use place::{Existential, GeoBbox, InvalidExistential, PlaceRecord};
pub use placetype::{Placetype, UnknownPlacetype};
pub use request::PointInPolygonRequest;
