//! Spatial database boundary.
//!
//! The pipeline only ever talks to a [`SpatialDatabase`]. Which backend sits
//! behind it is chosen once at startup from a database URI, see
//! [`open_database`].

mod feature;
mod rtree;

pub use feature::{parse_feature_collection, SpatialFeature};
pub use rtree::RTreeDatabase;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::models::PlaceRecord;
use crate::pip::{Coordinate, QueryFilter};

/// Errors reported by a spatial database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("invalid database URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("database path in '{uri}' is not valid UTF-8: {source}")]
    InvalidPath {
        uri: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("unsupported database scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("failed to read features from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("database unavailable: {0}")]
    Unavailable(String),
}

/// An engine answering point-in-polygon queries.
///
/// Implementations are shared as `Arc<dyn SpatialDatabase>` across every
/// in-flight request and must tolerate concurrent read-only calls without
/// external locking.
#[async_trait]
pub trait SpatialDatabase: Send + Sync {
    /// Short backend name, for logging
    fn name(&self) -> &str;

    /// Places containing `coord` that satisfy `filter`, in the engine's order.
    ///
    /// An empty vector is a successful answer.
    async fn point_in_polygon(
        &self,
        coord: Coordinate,
        filter: &QueryFilter,
    ) -> Result<Vec<PlaceRecord>, DatabaseError>;
}

/// Open the database named by `uri`.
///
/// Supported forms:
/// - `rtree://` empty in-memory index
/// - `rtree:///abs/path/features.geojson` index loaded from a file
/// - `rtree://?features=relative/path.geojson` same, with a query parameter
pub async fn open_database(uri: &str) -> Result<Arc<dyn SpatialDatabase>, DatabaseError> {
    let url = Url::parse(uri).map_err(|source| DatabaseError::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;

    match url.scheme() {
        "rtree" => {
            let db = match features_path(&url)? {
                Some(path) => {
                    info!("Loading features from {}", path.display());
                    RTreeDatabase::from_path(&path).await?
                }
                None => RTreeDatabase::build(Vec::new()),
            };
            Ok(Arc::new(db))
        }
        other => Err(DatabaseError::UnsupportedScheme(other.to_string())),
    }
}

/// Features file named by `url`, with host and path percent-decoded the same
/// way `query_pairs` decodes the `features` parameter.
fn features_path(url: &Url) -> Result<Option<PathBuf>, DatabaseError> {
    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "features") {
        return Ok(Some(PathBuf::from(value.into_owned())));
    }

    let host = url.host_str().unwrap_or_default();
    let path = url.path();
    if host.is_empty() && (path.is_empty() || path == "/") {
        return Ok(None);
    }

    let encoded = format!("{}{}", host, path);
    let decoded = percent_decode_str(&encoded)
        .decode_utf8()
        .map_err(|source| DatabaseError::InvalidPath {
            uri: url.to_string(),
            source,
        })?;

    Ok(Some(PathBuf::from(decoded.into_owned())))
}
