//! Error types for the point-in-polygon pipeline.

use thiserror::Error;

use crate::database::DatabaseError;
use crate::models::{InvalidExistential, UnknownPlacetype};

/// The request payload is not well-formed or lacks a required field.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// Longitude or latitude outside its valid range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
}

/// Filter options that are unknown or contradict each other.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error(transparent)]
    UnknownPlacetype(#[from] UnknownPlacetype),

    #[error("placetypes allow-list is empty")]
    EmptyPlacetypes,

    #[error("no placetypes remain after applying exclusions")]
    AllPlacetypesExcluded,

    #[error("unknown geometries selection '{0}', expected one of all, default, alternate")]
    UnknownGeometries(String),

    #[error("is_alt={is_alt} contradicts geometries={geometries}")]
    ContradictoryAlt { is_alt: bool, geometries: String },

    #[error("alternate_geometries requires alternate geometries to be selected")]
    AltLabelsWithoutAlternates,

    #[error("{flag} filter must not be empty")]
    EmptyExistential { flag: &'static str },

    #[error("{flag} filter: {source}")]
    InvalidExistential {
        flag: &'static str,
        #[source]
        source: InvalidExistential,
    },

    #[error("property names must not be empty")]
    EmptyProperty,
}

/// The spatial engine failed, or waiting for it was cancelled.
#[derive(Debug, Error)]
pub enum QueryExecutionError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("query cancelled before the database answered")]
    Cancelled,
}

/// A response could not be serialized.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Any failure of a single pipeline run.
#[derive(Debug, Error)]
pub enum PipError {
    #[error("invalid request: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("query failed: {0}")]
    QueryExecution(#[from] QueryExecutionError),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

impl PipError {
    /// Plain string handed to the host when a completion is rejected.
    pub fn rejection_message(&self) -> String {
        match self {
            PipError::Decode(e) => format!("Failed to parse request, {}", e),
            PipError::InvalidCoordinate(e) => {
                format!("Failed to query, failed to create new coordinate, {}", e)
            }
            PipError::Filter(e) => format!("Failed to query, {}", e),
            PipError::QueryExecution(e) => format!("Failed to query, {}", e),
            PipError::Encode(e) => format!("Failed to marshal response, {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipError>;
