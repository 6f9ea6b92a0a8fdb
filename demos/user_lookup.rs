//! User Lookup Example
//!
//! A two-argument lookup against a pretend user service. Individual calls are
//! expensive, the service also has a bulk endpoint; wrapping the lookup lets
//! independent callers share that bulk endpoint without knowing about it.
//!
//! Options come from `MICRO_BATCHER_*` environment variables when set.
//!
//! Usage:
//!   MICRO_BATCHER_SIZE_THRESHOLD=2 cargo run --example user_lookup

use micro_batcher::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserInfo {
    id: u32,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestOptions {
    priority: String,
    timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("user {0} is suspended")]
struct Suspended(u32);

async fn lookup(user: UserInfo, options: RequestOptions) -> anyhow::Result<String> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    if user.id == 13 {
        return Err(Suspended(user.id).into());
    }
    Ok(format!(
        "User {} ({}) - Priority: {}",
        user.id, user.name, options.priority
    ))
}

async fn bulk_lookup(requests: Vec<(UserInfo, RequestOptions)>) -> anyhow::Result<Vec<String>> {
    tracing::info!(size = requests.len(), "bulk lookup");
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(requests
        .into_iter()
        .map(|(user, options)| {
            format!(
                "User {} ({}) - Priority: {}",
                user.id, user.name, options.priority
            )
        })
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let options = BatchOptions::from_env();
    let lookup_user = MicroBatcher::spread(lookup)
        .batch_resolver(bulk_lookup)
        .options(&options)
        .name("user_lookup")
        .build()?;
    println!("config: {:?}\n", lookup_user.config());

    let high = RequestOptions {
        priority: "high".to_string(),
        timeout_ms: 5000,
    };
    let low = RequestOptions {
        priority: "low".to_string(),
        timeout_ms: 10000,
    };
    let users = [(1, "Alice"), (2, "Bob"), (3, "Charlie")];

    let mut handles = Vec::new();
    for (i, (id, name)) in users.into_iter().enumerate() {
        let lookup_user = lookup_user.clone();
        let opts = if i % 2 == 0 { high.clone() } else { low.clone() };
        handles.push(tokio::spawn(async move {
            lookup_user
                .call((
                    UserInfo {
                        id,
                        name: name.to_string(),
                    },
                    opts,
                ))
                .await
        }));
    }
    for handle in handles {
        println!("{}", handle.await??);
    }

    // A lone call with no batching partner goes through the single path.
    let single = lookup_user
        .call((
            UserInfo {
                id: 13,
                name: "Mallory".to_string(),
            },
            low,
        ))
        .await;
    match single {
        Ok(v) => println!("{}", v),
        Err(e) => println!(
            "lookup failed: {} (suspended: {})",
            e,
            e.downcast_ref::<Suspended>().is_some()
        ),
    }

    println!("\nstats: {:?}", lookup_user.stats());
    Ok(())
}
