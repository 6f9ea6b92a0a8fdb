//! Single-assignment result cells.

use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Settlement side of a pending call.
///
/// Settling consumes the cell, so it can be settled at most once. Dropping it
/// unsettled resolves the caller's [`PendingResult`] with [`Error::Abandoned`].
#[derive(Debug)]
pub struct ResultCell<R> {
    tx: oneshot::Sender<Result<R>>,
}

/// Caller side of a pending call: resolves once the matching [`ResultCell`] is settled.
#[derive(Debug)]
#[must_use = "a PendingResult does nothing unless awaited"]
pub struct PendingResult<R> {
    rx: oneshot::Receiver<Result<R>>,
}

/// Create a linked cell/result pair.
pub fn result_cell<R>() -> (ResultCell<R>, PendingResult<R>) {
    let (tx, rx) = oneshot::channel();
    (ResultCell { tx }, PendingResult { rx })
}

impl<R> ResultCell<R> {
    pub fn settle(self, value: R) {
        self.deliver(Ok(value));
    }

    pub fn settle_with_error(self, error: Error) {
        self.deliver(Err(error));
    }

    pub fn deliver(self, outcome: Result<R>) {
        // The caller may have dropped its PendingResult; nothing to notify then.
        if self.tx.send(outcome).is_err() {
            tracing::trace!("result cell settled after caller went away");
        }
    }

    /// True when the caller dropped its [`PendingResult`].
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<R> Future for PendingResult<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| Err(Error::Abandoned)))
    }
}
