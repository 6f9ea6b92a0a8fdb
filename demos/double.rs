//! Doubling Example
//!
//! Wraps a trivial async "double" operation and shows how calls are grouped:
//! - without a batch resolver every call runs on its own
//! - with a resolver, calls inside the window share one batch
//! - a size threshold flushes early, the remainder waits for the timer
//!
//! Usage:
//!   RUST_LOG=micro_batcher=debug cargo run --example double

use micro_batcher::prelude::*;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

async fn double(n: u64) -> Result<u64> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(n * 2)
}

async fn double_all(ns: Vec<u64>) -> Result<Vec<u64>> {
    println!("  resolver received {:?}", ns);
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(ns.into_iter().map(|n| n * 2).collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Micro-Batcher Doubling Demo ===\n");

    println!("--- Example 1: No resolver ---\n");
    let plain = MicroBatcher::new(double).build()?;
    run(&plain, 1..=3).await?;

    println!("--- Example 2: Window of 200ms ---\n");
    let windowed = MicroBatcher::new(double)
        .batch_resolver(double_all)
        .flush_interval(Duration::from_millis(200))
        .build()?;
    run(&windowed, 1..=4).await?;

    println!("--- Example 3: Size threshold of 3 ---\n");
    let thresholded = MicroBatcher::new(double)
        .batch_resolver(double_all)
        .flush_interval(Duration::from_millis(200))
        .size_threshold(3)
        .build()?;
    run(&thresholded, 1..=5).await?;

    let stats = thresholded.stats();
    println!(
        "threshold flushes: {}, timer flushes: {}, batch invocations: {}",
        stats.threshold_flushes, stats.timer_flushes, stats.batch_invocations
    );
    Ok(())
}

async fn run(f: &BatchedFn<u64, u64>, inputs: std::ops::RangeInclusive<u64>) -> Result<()> {
    let start = Instant::now();
    let pending: Vec<_> = inputs.map(|n| f.call(n)).collect();
    for p in pending {
        let value = p.await?;
        println!("  {} after {:?}", value, start.elapsed());
    }
    println!();
    Ok(())
}
