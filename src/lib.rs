//! pip-bridge - point-in-polygon lookups exposed to an embedding host
//!
//! A host calls a registered entry point with a serialized request and gets
//! back a completion that later resolves to the places containing the
//! requested coordinate, or rejects with a readable message.

pub mod bridge;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod host;
pub mod models;
pub mod pip;

pub use bridge::{CompletionHandle, PipBridge};
pub use database::{open_database, SpatialDatabase};
pub use error::PipError;
pub use host::{EntryPoint, Host};
pub use models::{PlaceRecord, Placetype, PointInPolygonRequest};
