//! Shared fixtures for integration tests
#![allow(dead_code)]

use micro_batcher::MicroBatcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every invocation of a `double` operation and its batch resolver.
#[derive(Clone, Default)]
pub struct DoubleFixture {
    single_calls: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<Vec<u64>>>>,
}

impl DoubleFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// `double(n) = n * 2`, no batch resolver.
    pub fn builder(&self) -> MicroBatcher<u64, u64> {
        let calls = Arc::clone(&self.single_calls);
        MicroBatcher::new(move |n: u64| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(n * 2) }
        })
    }

    /// `double` plus `batchDouble(list) = list.map(n => n * 2)`.
    pub fn batching_builder(&self) -> MicroBatcher<u64, u64> {
        self.batching_builder_with_latency(Duration::ZERO)
    }

    /// Like [`Self::batching_builder`], with the resolver taking `latency` to answer.
    pub fn batching_builder_with_latency(&self, latency: Duration) -> MicroBatcher<u64, u64> {
        let batches = Arc::clone(&self.batches);
        self.builder().batch_resolver(move |ns: Vec<u64>| {
            batches.lock().unwrap().push(ns.clone());
            async move {
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                Ok::<_, String>(ns.into_iter().map(|n| n * 2).collect::<Vec<_>>())
            }
        })
    }

    pub fn single_count(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<u64>> {
        self.batches.lock().unwrap().clone()
    }
}

/// Operation error type used to check error preservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupError {
    pub id: u64,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lookup failed for {}", self.id)
    }
}

impl std::error::Error for LookupError {}
