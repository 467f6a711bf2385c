//! End-to-end test of the HTTP wire binding: a real server task, a real
//! `PeerClient`, and a real TCP round-trip — mirroring the teacher's
//! `hkv-client/tests/client.rs` convention of testing the client against
//! a live listener rather than mocking the transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use geecache_common::{ByteView, GeecacheResult};
use geecache_engine::{Group, Loader, PeerGetter, Registry};
use geecache_server::serve_listener;

struct CountingLoader {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Loader for CountingLoader {
    async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ByteView::copy_from(format!("value-for-{key}").as_bytes()))
    }
}

async fn spawn_server(registry: Arc<Registry>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    tokio::spawn(async move {
        let _ = serve_listener(listener, "/_geecache/".into(), registry).await;
    });
    addr
}

#[tokio::test]
async fn client_fetches_a_value_the_server_loads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(Group::new(
        "scores",
        10,
        Arc::new(CountingLoader { calls: calls.clone() }),
    )));

    let addr = spawn_server(registry).await;
    let client = geecache_client::PeerClient::new(addr, "/_geecache/");

    let value = client.fetch("scores", "tom").await.unwrap();
    assert_eq!(&value[..], b"value-for-tom");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_sees_404_for_an_unknown_group() {
    let registry = Arc::new(Registry::new());
    let addr = spawn_server(registry).await;
    let client = geecache_client::PeerClient::new(addr, "/_geecache/");

    let result = client.fetch("missing-group", "tom").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn repeated_fetches_for_the_same_key_hit_the_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(Group::new(
        "scores",
        10,
        Arc::new(CountingLoader { calls: calls.clone() }),
    )));

    let addr = spawn_server(registry).await;
    let client = geecache_client::PeerClient::new(addr, "/_geecache/");

    client.fetch("scores", "tom").await.unwrap();
    client.fetch("scores", "tom").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
