//! Asynchronous bridge between the host and the lookup pipeline.
//!
//! [`PipBridge::submit`] returns a pending [`CompletionHandle`] straight away
//! and runs decode, validate, filter, query and encode on a spawned task. The
//! task settles the handle exactly once.
//!
//! There is no admission control, cancellation or timeout at this layer:
//! every submission is scheduled immediately and runs until the database
//! answers. Completions settle in whatever order their pipelines finish.

mod completion;

pub use completion::{
    completion, Completer, Completion, CompletionHandle, CompletionState, ABANDONED,
};

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::codec::{decode_request, encode_response};
use crate::database::SpatialDatabase;
use crate::error::PipError;
use crate::pip::{Coordinate, QueryContext, QueryFilter, SpatialQueryClient};

/// Host-facing entry into the point-in-polygon pipeline
#[derive(Clone)]
pub struct PipBridge {
    client: SpatialQueryClient,
    runtime: Handle,
}

impl PipBridge {
    /// Create a bridge over a shared database, spawning work onto `runtime`
    pub fn new(database: Arc<dyn SpatialDatabase>, runtime: Handle) -> Self {
        Self {
            client: SpatialQueryClient::new(database),
            runtime,
        }
    }

    /// Schedule a request and return its pending completion.
    ///
    /// Never blocks; safe to call from any thread, any number of times.
    pub fn submit(&self, raw: impl Into<Vec<u8>>) -> CompletionHandle {
        let (completer, handle) = completion();
        let client = self.client.clone();
        let raw: Vec<u8> = raw.into();

        self.runtime.spawn(async move {
            match run_pipeline(&client, &raw).await {
                Ok(payload) => {
                    debug!("Resolved request ({} bytes)", payload.len());
                    completer.resolve(payload);
                }
                Err(e) => {
                    warn!("Rejected request: {}", e);
                    completer.reject(e.rejection_message());
                }
            }
        });

        handle
    }

    pub fn client(&self) -> &SpatialQueryClient {
        &self.client
    }
}

/// Run one request through every stage, returning the encoded response.
pub async fn run_pipeline(
    client: &SpatialQueryClient,
    raw: impl AsRef<[u8]>,
) -> Result<String, PipError> {
    let req = decode_request(raw)?;
    let coord = Coordinate::try_from(&req)?;
    let filter = QueryFilter::from_request(&req)?;

    let places = client
        .point_in_polygon(&QueryContext::new(), coord, &filter)
        .await?;

    Ok(encode_response(&places)?)
}
