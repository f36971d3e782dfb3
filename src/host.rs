//! Host side of the bridge: entry point registry and a line-oriented host loop.

use futures::stream::{FuturesUnordered, StreamExt};
use hashbrown::HashMap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::bridge::{CompletionHandle, PipBridge};

/// Name the entry point is registered under unless configured otherwise
pub const DEFAULT_ENTRY_POINT: &str = "point_in_polygon";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("entry point '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("no entry point registered as '{0}'")]
    NotRegistered(String),

    #[error("entry point name must not be empty")]
    EmptyName,

    #[error("host I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode host reply: {0}")]
    Reply(#[from] serde_json::Error),
}

/// A callable exposed to the host: `(serialized request) -> completion`
#[derive(Clone)]
pub struct EntryPoint {
    bridge: Arc<PipBridge>,
}

impl EntryPoint {
    pub fn new(bridge: Arc<PipBridge>) -> Self {
        Self { bridge }
    }

    /// Invoke synchronously; the returned handle settles later.
    pub fn call(&self, serialized: impl AsRef<[u8]>) -> CompletionHandle {
        self.bridge.submit(serialized.as_ref())
    }
}

/// Registry of named entry points, built once at startup.
#[derive(Default)]
pub struct Host {
    entry_points: HashMap<String, EntryPoint>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `name`. Each name may be registered once.
    pub fn register(&mut self, name: &str, entry: EntryPoint) -> Result<(), HostError> {
        if name.is_empty() {
            return Err(HostError::EmptyName);
        }
        if self.entry_points.contains_key(name) {
            return Err(HostError::AlreadyRegistered(name.to_string()));
        }

        self.entry_points.insert(name.to_string(), entry);
        info!("Registered entry point '{}'", name);
        Ok(())
    }

    pub fn entry_point(&self, name: &str) -> Result<&EntryPoint, HostError> {
        self.entry_points
            .get(name)
            .ok_or_else(|| HostError::NotRegistered(name.to_string()))
    }

    /// Call a registered entry point by name
    pub fn invoke(&self, name: &str, serialized: &str) -> Result<CompletionHandle, HostError> {
        Ok(self.entry_point(name)?.call(serialized))
    }
}

#[derive(Serialize)]
struct HostReply<'a> {
    seq: u64,
    status: &'static str,
    body: &'a str,
}

/// Feed one request per input line to `entry`, writing each settled
/// completion as a JSON line `{"seq":N,"status":"resolved"|"rejected","body":"..."}`.
///
/// Reading never waits on an outstanding completion, so replies can come back
/// in any order; `seq` is the 1-based index of the non-blank input line.
/// Lines are passed through as raw bytes, so a line that is not valid UTF-8
/// gets a `rejected` reply like any other malformed request.
///
/// A read error ends input but every request already submitted is still
/// answered. Once a write fails no further replies are written; the remaining
/// completions are awaited and logged, then the write error is returned.
/// Otherwise returns the number of requests served once input is exhausted
/// and every completion has been written.
pub async fn serve_lines<R, W>(
    entry: &EntryPoint,
    mut reader: R,
    mut writer: W,
) -> Result<u64, HostError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending = FuturesUnordered::new();
    let mut buf = Vec::new();
    let mut seq: u64 = 0;
    let mut reading = true;
    let mut write_error: Option<HostError> = None;

    while reading || !pending.is_empty() {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf), if reading => {
                match read {
                    Ok(0) => reading = false,
                    Ok(_) => {}
                    Err(e) => {
                        error!("Failed to read host input: {}", e);
                        reading = false;
                    }
                }

                // A trailing line without a newline is still a request
                if buf.ends_with(b"\n") || (!reading && !buf.is_empty()) {
                    let line = std::mem::take(&mut buf);
                    let line = trim_line(&line);
                    if !line.iter().all(u8::is_ascii_whitespace) {
                        seq += 1;
                        debug!("Request {} submitted", seq);
                        let handle = entry.call(line);
                        let id = seq;
                        pending.push(async move { (id, handle.await) });
                    }
                }
            }
            Some((id, outcome)) = pending.next(), if !pending.is_empty() => {
                if write_error.is_some() {
                    warn!("Dropping reply {}: host output failed", id);
                } else if let Err(e) = write_reply(&mut writer, id, &outcome).await {
                    error!("Failed to write reply {}: {}", id, e);
                    write_error = Some(e);
                    reading = false;
                }
            }
        }
    }

    match write_error {
        Some(e) => Err(e),
        None => Ok(seq),
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_reply<W>(
    writer: &mut W,
    seq: u64,
    outcome: &Result<String, String>,
) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
{
    let reply = match outcome {
        Ok(payload) => HostReply {
            seq,
            status: "resolved",
            body: payload,
        },
        Err(message) => HostReply {
            seq,
            status: "rejected",
            body: message,
        },
    };

    let mut line = serde_json::to_vec(&reply)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
