//! The periodic anti-entropy loop.
//!
//! Every interval the loop discovers the current peer set, drops itself
//! from the list, picks one peer at random and runs a push/pull exchange
//! with it. Convergence does not require every pair to be discovered
//! mutually: a single exchange merges state in both directions.

use crate::discovery::DiscoveryProvider;
use crate::transport::{self, TransportConfig};
use gossipkv_engine::MembershipDelegate;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Spawn the anti-entropy task.
pub fn spawn_sync_task<D, P>(
    delegate: Arc<D>,
    discovery: Arc<P>,
    config: TransportConfig,
    local_addr: SocketAddr,
    sync_interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    D: MembershipDelegate,
    P: DiscoveryProvider,
{
    tokio::spawn(async move {
        let mut tick = interval(sync_interval);
        loop {
            tick.tick().await;
            sync_round(delegate.as_ref(), discovery.as_ref(), &config, local_addr).await;
        }
    })
}

/// One round: discover peers, pick one at random, exchange state with it.
pub async fn sync_round<D, P>(
    delegate: &D,
    discovery: &P,
    config: &TransportConfig,
    local_addr: SocketAddr,
) where
    D: MembershipDelegate,
    P: DiscoveryProvider,
{
    let peers = match discovery.discover_peers().await {
        Ok(peers) => peers,
        Err(err) => {
            tracing::warn!("peer discovery failed: {}", err);
            return;
        }
    };

    let candidates: Vec<SocketAddr> = peers.into_iter().filter(|p| *p != local_addr).collect();
    if candidates.is_empty() {
        return;
    }
    let peer = candidates[rand::thread_rng().gen_range(0..candidates.len())];

    let m = gossipkv_metrics::metrics();
    let _timer = gossipkv_metrics::start_sync_timer("initiator");
    match transport::push_pull(delegate, config, peer, false).await {
        Ok(()) => {
            m.sync_rounds.inc();
            tracing::debug!("push/pull with {} complete", peer);
        }
        Err(err) => {
            m.sync_failures.inc();
            tracing::debug!("push/pull with {} failed: {}", peer, err);
        }
    }
}
