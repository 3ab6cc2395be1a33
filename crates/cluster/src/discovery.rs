//! Peer discovery seam.
//!
//! The sync loop asks a provider for the current peer address list at the
//! start of every round, so providers are free to return a changing view.
//! DNS, Kubernetes and NATS providers live outside this crate; the static
//! provider covers fixed clusters and tests.

use crate::ClusterError;
use std::net::SocketAddr;

/// Supplies the current peer address list for anti-entropy rounds.
#[async_trait::async_trait]
pub trait DiscoveryProvider: Send + Sync + 'static {
    async fn discover_peers(&self) -> Result<Vec<SocketAddr>, ClusterError>;
}

/// A fixed peer list.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    peers: Vec<SocketAddr>,
}

impl StaticProvider {
    pub fn new(peers: Vec<SocketAddr>) -> Self {
        Self { peers }
    }

    /// Parse "host:port" strings, skipping unparseable entries with a
    /// warning.
    pub fn from_strings(seeds: &[String]) -> Self {
        let peers = seeds
            .iter()
            .filter_map(|s| match s.parse() {
                Ok(addr) => Some(addr),
                Err(err) => {
                    tracing::warn!("ignoring unparseable seed '{}': {}", s, err);
                    None
                }
            })
            .collect();
        Self { peers }
    }
}

#[async_trait::async_trait]
impl DiscoveryProvider for StaticProvider {
    async fn discover_peers(&self) -> Result<Vec<SocketAddr>, ClusterError> {
        Ok(self.peers.clone())
    }
}
