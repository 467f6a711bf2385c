//! # Group Read-Path Benchmark
//!
//! Exercises `Group::get` end to end (cache hit path and single-flight
//! coalescing under concurrent misses), separately from the raw store
//! benchmark in `bench_cache`, since the read path adds coalescing and
//! async scheduling overhead the bare store doesn't have.

use std::env;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use geecache_common::{ByteView, GeecacheResult};
use geecache_engine::{Group, Loader};

struct EchoLoader;

#[async_trait]
impl Loader for EchoLoader {
    async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
        Ok(ByteView::copy_from(key.as_bytes()))
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    println!(
        "{label}: {ops} ops in {secs:.3}s ({:.0} ops/s)",
        ops as f64 / secs
    );
}

#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);
    let concurrency = parse_usize(args.next(), 64);
    let ops_per_task = parse_usize(args.next(), 10_000);

    let group = Arc::new(Group::new("bench", 10_000, Arc::new(EchoLoader)));

    // Warm the cache with a single key so the steady-state benchmark
    // measures cache-hit throughput, not loader throughput.
    group.get("hot-key").await.unwrap();

    let start = Instant::now();
    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let group = group.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..ops_per_task {
                group.get("hot-key").await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    report("Group::get (cache hit)", concurrency * ops_per_task, start.elapsed());

    // A fresh key per task forces every task to race into the loader
    // for the same miss, measuring single-flight coalescing overhead.
    let start = Instant::now();
    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let group = group.clone();
        handles.push(tokio::spawn(async move { group.get("shared-miss").await.unwrap() }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    report("Group::get (coalesced miss)", concurrency, start.elapsed());
}
