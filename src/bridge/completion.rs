//! One-shot completion cell shared between a pipeline run and the host.
//!
//! [`completion`] returns a connected pair. The [`Completer`] side is moved
//! into the pipeline task and settles the cell; the [`CompletionHandle`] side
//! is handed to the host, which can peek at it or await it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot::{self, error::TryRecvError};

/// Rejection reported when a pipeline task ends without settling its cell
pub const ABANDONED: &str = "pipeline terminated before completing";

/// Terminal value of a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Resolved(String),
    Rejected(String),
}

impl Completion {
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Completion::Resolved(payload) => Ok(payload),
            Completion::Rejected(message) => Err(message),
        }
    }
}

/// Observable state of a [`CompletionHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState<'a> {
    Pending,
    Resolved(&'a str),
    Rejected(&'a str),
}

/// Create a connected completer/handle pair in the pending state.
pub fn completion() -> (Completer, CompletionHandle) {
    let (tx, rx) = oneshot::channel();
    (
        Completer { tx },
        CompletionHandle {
            rx,
            outcome: None,
        },
    )
}

/// Write side of a completion cell.
///
/// Both transitions consume the completer, so a cell can be settled at most
/// once:
///
/// ```compile_fail
/// let (completer, _handle) = pip_bridge::bridge::completion();
/// completer.resolve("[]".to_string());
/// completer.reject("too late".to_string());
/// ```
///
/// Dropping a completer without settling it rejects the handle with
/// [`ABANDONED`].
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<Completion>,
}

impl Completer {
    pub fn resolve(self, payload: String) {
        self.settle(Completion::Resolved(payload));
    }

    pub fn reject(self, message: String) {
        self.settle(Completion::Rejected(message));
    }

    /// Settle from a pipeline result
    pub fn complete(self, result: Result<String, String>) {
        match result {
            Ok(payload) => self.resolve(payload),
            Err(message) => self.reject(message),
        }
    }

    fn settle(self, completion: Completion) {
        // The host may have dropped its handle; nobody is left to tell.
        let _ = self.tx.send(completion);
    }
}

/// Read side of a completion cell, held by the host.
///
/// Awaiting the handle yields `Ok(payload)` or `Err(message)`. Once a
/// terminal value has been observed it never changes.
#[derive(Debug)]
pub struct CompletionHandle {
    rx: oneshot::Receiver<Completion>,
    outcome: Option<Completion>,
}

impl CompletionHandle {
    /// Non-blocking look at the current state
    pub fn state(&mut self) -> CompletionState<'_> {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(completion) => self.outcome = Some(completion),
                Err(TryRecvError::Empty) => return CompletionState::Pending,
                Err(TryRecvError::Closed) => {
                    self.outcome = Some(Completion::Rejected(ABANDONED.to_string()))
                }
            }
        }

        match &self.outcome {
            Some(Completion::Resolved(payload)) => CompletionState::Resolved(payload),
            Some(Completion::Rejected(message)) => CompletionState::Rejected(message),
            None => CompletionState::Pending,
        }
    }

    pub fn is_terminal(&mut self) -> bool {
        !matches!(self.state(), CompletionState::Pending)
    }
}

impl Future for CompletionHandle {
    type Output = Result<String, String>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.outcome.is_none() {
            let completion = match Pin::new(&mut this.rx).poll(cx) {
                Poll::Ready(Ok(completion)) => completion,
                Poll::Ready(Err(_)) => Completion::Rejected(ABANDONED.to_string()),
                Poll::Pending => return Poll::Pending,
            };
            this.outcome = Some(completion);
        }

        match &this.outcome {
            Some(completion) => Poll::Ready(completion.clone().into_result()),
            None => Poll::Pending,
        }
    }
}
