//! Node wiring: engine, delegate, listener and background tasks.

use crate::discovery::DiscoveryProvider;
use crate::janitor::{self, JanitorConfig};
use crate::sync;
use crate::transport::{self, TransportConfig};
use crate::ClusterError;
use futures::future::join_all;
use gossipkv_client::Client;
use gossipkv_common::clock;
use gossipkv_config::NodeConfig;
use gossipkv_engine::{StateDelegate, StateEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// A running gossipkv node.
///
/// Owns the push/pull listener, the anti-entropy loop and the janitor.
/// Dropping the node leaks the tasks; call [`Node::stop`] to tear them
/// down.
pub struct Node {
    name: String,
    addr: SocketAddr,
    engine: Arc<StateEngine>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Bind the listener, join through the discovered peers, and spawn the
    /// sync and janitor tasks.
    pub async fn start<P: DiscoveryProvider>(
        config: NodeConfig,
        discovery: Arc<P>,
    ) -> Result<Self, ClusterError> {
        config
            .validate()
            .map_err(|e| ClusterError::Config(e.to_string()))?;

        let listener = TcpListener::bind(config.listen).await?;
        let addr = listener.local_addr()?;
        let name = match &config.name {
            Some(name) => name.clone(),
            None => addr.to_string(),
        };

        let engine = Arc::new(StateEngine::new(name.clone()));
        let meta = gossipkv_proto::NodeMeta {
            name: name.clone(),
            host: addr.ip().to_string(),
            port: u32::from(addr.port()),
            discovery_port: u32::from(config.discovery_port.unwrap_or(addr.port())),
            creation_time: Some(prost_types::Timestamp {
                seconds: clock::now_unix_secs(),
                nanos: 0,
            }),
        };
        let delegate = Arc::new(StateDelegate::new(engine.clone(), meta));

        let transport_config = TransportConfig {
            node_name: name.clone(),
            cookie: config.cookie.clone(),
            exchange_timeout: Duration::from_millis(config.sync.exchange_timeout_ms),
        };

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(transport::serve(
            listener,
            delegate.clone(),
            transport_config.clone(),
        )));

        // Initial join: one push/pull against every known peer.
        let peers: Vec<SocketAddr> = discovery
            .discover_peers()
            .await?
            .into_iter()
            .filter(|p| *p != addr)
            .collect();
        if !peers.is_empty() {
            tracing::info!("joining through {} peer(s)", peers.len());
            let joins = peers.iter().map(|peer| {
                let delegate = delegate.clone();
                let transport_config = transport_config.clone();
                let peer = *peer;
                async move {
                    if let Err(err) =
                        transport::push_pull(delegate.as_ref(), &transport_config, peer, true).await
                    {
                        tracing::warn!("join push/pull with {} failed: {}", peer, err);
                    }
                }
            });
            join_all(joins).await;
        }

        tasks.push(sync::spawn_sync_task(
            delegate,
            discovery,
            transport_config,
            addr,
            Duration::from_millis(config.sync.interval_ms),
        ));

        tasks.push(janitor::spawn_janitor_task(
            engine.clone(),
            JanitorConfig {
                sweep_interval: Duration::from_millis(config.janitor.interval_ms),
                tombstone_max_age: Duration::from_secs(config.janitor.tombstone_max_age_secs),
            },
        ));

        tracing::info!("node {} serving push/pull on {}", name, addr);

        Ok(Self {
            name,
            addr,
            engine,
            tasks,
        })
    }

    /// The node id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound push/pull address (useful when listening on port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<StateEngine> {
        &self.engine
    }

    /// A typed client onto this node's replica.
    pub fn client(&self) -> Client {
        Client::new(self.engine.clone())
    }

    /// Stop the background tasks. In-flight exchanges are abandoned.
    pub async fn stop(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
