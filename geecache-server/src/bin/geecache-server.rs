//! Reference entrypoint for a single geecache node: loads configuration,
//! wires the peer pool and a demo group, and serves HTTP until killed.
//!
//! A production embedder links `geecache-engine` directly and registers
//! its own [`geecache_engine::Loader`] impls against real data sources;
//! this binary exists to exercise the wire protocol end to end and as a
//! starting point to copy from.

use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use geecache_common::{ByteView, GeecacheConfig, GeecacheResult};
use geecache_engine::{Group, Loader, Registry};
use geecache_server::{serve, HttpPeerPool};

struct EchoLoader;

#[async_trait]
impl Loader for EchoLoader {
    async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
        Ok(ByteView::from_vec(format!("value-for-{key}").into_bytes()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GeecacheConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .init();

    let peer_pool = Arc::new(HttpPeerPool::new(
        config.listen_addr.clone(),
        config.base_path.clone(),
        config.replicas,
    ));
    let mut all_peers = config.peers.clone();
    if !all_peers.contains(&config.listen_addr) {
        all_peers.push(config.listen_addr.clone());
    }
    peer_pool.set_peers(&all_peers);

    let registry = Arc::new(Registry::new());
    let demo_group = Arc::new(Group::with_sweeper(
        "default",
        config.default_capacity,
        Arc::new(EchoLoader),
        config.default_ttl(),
        config.sweep_interval(),
        256,
    ));
    demo_group.register_peer_picker(peer_pool);
    registry.register(demo_group);

    serve(&config.listen_addr, config.base_path.clone().into(), registry).await?;
    Ok(())
}
