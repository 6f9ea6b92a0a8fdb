//! Pending-call ledger.

use super::cell::{result_cell, PendingResult, ResultCell};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One not-yet-resolved call: the caller's payload and the cell its result goes to.
#[derive(Debug)]
pub struct PendingCall<P, R> {
    pub payload: P,
    pub cell: ResultCell<R>,
    pub seq: u64,
    pub enqueued_at: Instant,
}

impl<P, R> PendingCall<P, R> {
    /// Time spent in the ledger so far.
    pub fn queued_for(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    pub fn into_parts(self) -> (P, ResultCell<R>) {
        (self.payload, self.cell)
    }
}

/// Calls drained together in one flush, oldest first.
pub type BatchGroup<P, R> = Vec<PendingCall<P, R>>;

struct Inner<P, R> {
    calls: VecDeque<PendingCall<P, R>>,
    next_seq: u64,
}

/// FIFO of pending calls. Enqueue and drain are each atomic under one lock.
pub struct Ledger<P, R> {
    inner: Mutex<Inner<P, R>>,
}

impl<P, R> Ledger<P, R> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                calls: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    // The queue stays structurally valid even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Inner<P, R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a call and return its pending result plus the ledger size after the append.
    pub fn enqueue(&self, payload: P) -> (PendingResult<R>, usize) {
        let (cell, pending) = result_cell();
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.calls.push_back(PendingCall {
            payload,
            cell,
            seq,
            enqueued_at: Instant::now(),
        });
        (pending, inner.calls.len())
    }

    pub fn size(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Remove up to `max_count` calls (all when `None`), oldest first.
    pub fn drain(&self, max_count: Option<usize>) -> BatchGroup<P, R> {
        let mut inner = self.lock();
        let n = max_count.map_or(inner.calls.len(), |m| m.min(inner.calls.len()));
        inner.calls.drain(..n).collect()
    }
}

impl<P, R> Default for Ledger<P, R> {
    fn default() -> Self {
        Self::new()
    }
}
