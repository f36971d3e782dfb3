//! Client for running point-in-polygon lookups against the spatial database.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Coordinate, QueryFilter};
use crate::database::SpatialDatabase;
use crate::error::QueryExecutionError;
use crate::models::PlaceRecord;

/// Execution context for a single query.
///
/// Cancelling the token makes the client stop waiting. It does not abort the
/// database call already in progress.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancellation: CancellationToken,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that is cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Point-in-polygon lookup client over a shared database handle
#[derive(Clone)]
pub struct SpatialQueryClient {
    database: Arc<dyn SpatialDatabase>,
}

impl SpatialQueryClient {
    /// Create a new client from a shared database handle
    pub fn new(database: Arc<dyn SpatialDatabase>) -> Self {
        Self { database }
    }

    /// Places containing `coord` that satisfy `filter`, in database order.
    ///
    /// No containing place is a successful, empty answer.
    pub async fn point_in_polygon(
        &self,
        ctx: &QueryContext,
        coord: Coordinate,
        filter: &QueryFilter,
    ) -> Result<Vec<PlaceRecord>, QueryExecutionError> {
        let places = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => {
                return Err(QueryExecutionError::Cancelled);
            }
            result = self.database.point_in_polygon(coord, filter) => result?,
        };

        debug!(
            "{} lookup at {}: {} places",
            self.database.name(),
            coord,
            places.len()
        );

        Ok(places)
    }
}
