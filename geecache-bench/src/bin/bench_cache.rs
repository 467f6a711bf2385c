//! # Cache Benchmark Harness
//!
//! Purpose: Provide a dependency-free, repeatable benchmark driver for
//! the bounded LRU store and the consistent-hash ring so baseline
//! throughput can be compared over time.
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: Use a fixed PRNG seed for stable
//!    comparisons across runs.
//! 2. **Allocation Control**: Pre-build keys/values to keep setup costs
//!    off the hot path.
//! 3. **No External Deps**: The harness itself pulls in nothing beyond
//!    the crates under test.

use std::env;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use geecache_common::ByteView;
use geecache_engine::{HashRing, LruStore};

const DEFAULT_KEY_COUNT: usize = 1 << 16;
const DEFAULT_OP_COUNT: usize = 1_000_000;
const DEFAULT_VALUE_SIZE: usize = 128;

struct BenchConfig {
    requested_keys: usize,
    key_count: usize,
    key_mask: usize,
    op_count: usize,
    value_size: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let requested_keys = parse_usize(args.next(), DEFAULT_KEY_COUNT);
        let op_count = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let value_size = parse_usize(args.next(), DEFAULT_VALUE_SIZE);

        let key_count = normalize_power_of_two(requested_keys);
        let key_mask = key_count - 1;

        BenchConfig {
            requested_keys,
            key_count,
            key_mask,
            op_count,
            value_size,
        }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn normalize_power_of_two(value: usize) -> usize {
    let value = value.max(1);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

/// Tiny deterministic PRNG used to avoid external dependencies.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    #[inline]
    fn next_index(&mut self, mask: usize) -> usize {
        (self.next_u64() as usize) & mask
    }
}

fn build_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key-{i:016x}")).collect()
}

fn build_values(count: usize, size: usize, seed: u64) -> Vec<ByteView> {
    (0..count)
        .map(|i| {
            let mut buffer = vec![0u8; size];
            let bytes = (seed ^ (i as u64)).to_le_bytes();
            let copy_len = buffer.len().min(bytes.len());
            buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
            ByteView::from_vec(buffer)
        })
        .collect()
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {nanos_per_op:.1} ns/op)");
}

fn main() {
    let config = BenchConfig::from_args();

    let keys = build_keys(config.key_count);
    let values = build_values(config.key_count, config.value_size, 0x5A5A_5A5A_5A5A_5A5A);

    println!(
        "keys: requested={}, actual={}, ops={}, value_size={}",
        config.requested_keys, config.key_count, config.op_count, config.value_size
    );

    bench_store(&config, &keys, &values);
    bench_ring(&config, &keys);
}

fn bench_store(config: &BenchConfig, keys: &[String], values: &[ByteView]) {
    let store = Arc::new(LruStore::new(config.key_count));
    for idx in 0..config.key_count {
        store.add(&keys[idx], values[idx].clone(), None);
    }

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let value = store.get(&keys[idx]);
        black_box(value);
    }
    report("LruStore::get", config.op_count, start.elapsed());

    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        store.add(&keys[idx], values[idx].clone(), None);
    }
    report("LruStore::add", config.op_count, start.elapsed());
}

fn bench_ring(config: &BenchConfig, keys: &[String]) {
    let mut ring = HashRing::new(50);
    let peers: Vec<String> = (0..16).map(|i| format!("10.0.0.{i}:9090")).collect();
    ring.add(&peers);

    let mut rng = XorShift64::new(0xABCD_EF01_2345_6789);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let owner = ring.get(&keys[idx]);
        black_box(owner);
    }
    report("HashRing::get", config.op_count, start.elapsed());
}
