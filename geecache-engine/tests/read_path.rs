//! Integration tests for the composed read path: a `Group` wired with a
//! peer picker, exercising single-flight coalescing and peer-fallback
//! behavior end to end rather than each piece in isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use geecache_common::{ByteView, GeecacheError, GeecacheResult};
use geecache_engine::{Group, Loader, PeerGetter, PeerPicker};

struct CountingLoader {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl Loader for CountingLoader {
    async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ByteView::copy_from(key.as_bytes()))
    }
}

/// A peer picker that always routes to an unreachable peer, used to
/// exercise S6's fallback-to-local-loader path.
struct AlwaysUnreachablePeer;

struct UnreachableGetter;

#[async_trait]
impl PeerGetter for UnreachableGetter {
    async fn fetch(&self, _group: &str, _key: &str) -> GeecacheResult<bytes::Bytes> {
        Err(GeecacheError::PeerFetch("connection refused".to_string()))
    }
}

impl PeerPicker for AlwaysUnreachablePeer {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
        Some(Arc::new(UnreachableGetter))
    }
}

#[tokio::test]
async fn s4_concurrent_miss_coalesces_into_one_loader_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = Arc::new(Group::new(
        "scores",
        100,
        Arc::new(CountingLoader {
            calls: calls.clone(),
            delay: Duration::from_millis(100),
        }),
    ));

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..100 {
        let group = group.clone();
        handles.push(tokio::spawn(async move { group.get("tom").await }));
    }

    for handle in handles {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value.as_bytes(), b"tom");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn s6_peer_fallback_serves_local_loader_without_surfacing_an_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = Group::new(
        "scores",
        10,
        Arc::new(CountingLoader {
            calls: calls.clone(),
            delay: Duration::ZERO,
        }),
    );
    group.register_peer_picker(Arc::new(AlwaysUnreachablePeer));

    let value = group.get("jack").await.unwrap();
    assert_eq!(value.as_bytes(), b"jack");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn s3_per_key_loader_runs_exactly_once_across_sequential_gets() {
    let calls = Arc::new(AtomicUsize::new(0));
    let group = Group::new(
        "scores",
        10,
        Arc::new(CountingLoader {
            calls: calls.clone(),
            delay: Duration::ZERO,
        }),
    );

    let first = group.get("tom").await.unwrap();
    let second = group.get("tom").await.unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
