//! The boundary between the engine and the gossip transport.

use crate::engine::StateEngine;
use prost::Message;
use std::sync::Arc;

/// Callbacks the membership transport invokes against the local replica.
///
/// The transport may call these concurrently from multiple tasks. None of
/// them may block it: every callback completes quickly and never holds the
/// engine lock across I/O.
#[async_trait::async_trait]
pub trait MembershipDelegate: Send + Sync + 'static {
    /// Node identity bytes for alive broadcasts, at most `limit` bytes.
    async fn node_meta(&self, limit: usize) -> Vec<u8>;

    /// A user-data message arrived. Anti-entropy carries all state, so this
    /// channel goes unused.
    async fn notify_msg(&self, msg: &[u8]);

    /// User messages to piggyback on gossip. Always empty here.
    async fn get_broadcasts(&self, overhead: usize, limit: usize) -> Vec<Vec<u8>>;

    /// The serialized local replica for one side of a push/pull. The join
    /// flag is ignored: joins and periodic exchanges ship the same payload.
    async fn local_state(&self, join: bool) -> Vec<u8>;

    /// Apply the replica received from the remote side of a push/pull.
    async fn merge_remote_state(&self, buf: &[u8], join: bool);
}

/// The engine-backed delegate the cluster host hands to its transport.
#[derive(Debug)]
pub struct StateDelegate {
    engine: Arc<StateEngine>,
    meta: gossipkv_proto::NodeMeta,
}

impl StateDelegate {
    pub fn new(engine: Arc<StateEngine>, meta: gossipkv_proto::NodeMeta) -> Self {
        Self { engine, meta }
    }

    pub fn engine(&self) -> &Arc<StateEngine> {
        &self.engine
    }
}

#[async_trait::async_trait]
impl MembershipDelegate for StateDelegate {
    async fn node_meta(&self, limit: usize) -> Vec<u8> {
        let mut bytes = self.meta.encode_to_vec();
        if bytes.len() > limit {
            tracing::warn!(
                "node meta is {} bytes, truncating to the {}-byte broadcast limit",
                bytes.len(),
                limit
            );
            bytes.truncate(limit);
        }
        bytes
    }

    async fn notify_msg(&self, _msg: &[u8]) {}

    async fn get_broadcasts(&self, _overhead: usize, _limit: usize) -> Vec<Vec<u8>> {
        Vec::new()
    }

    async fn local_state(&self, _join: bool) -> Vec<u8> {
        self.engine.export_local_state().await
    }

    async fn merge_remote_state(&self, buf: &[u8], _join: bool) {
        let stats = self.engine.merge_remote_state(buf).await;
        let m = gossipkv_metrics::metrics();
        m.merge_entries.inc_by(stats.entries_applied as u64);
        m.merge_partitions.inc_by(stats.partitions_added as u64);
        if stats.partitions_added > 0 || stats.entries_applied > 0 {
            tracing::debug!(
                "merged remote state: {} new partitions, {} entries applied",
                stats.partitions_added,
                stats.entries_applied
            );
        }
    }
}
