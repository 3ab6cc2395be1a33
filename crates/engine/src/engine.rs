//! The synchronized container around the replicated state.

use crate::entry::Entry;
use crate::fsm::{Fsm, MergeStats};
use crate::wire;
use gossipkv_common::{clock, KvError};
use prost::Message;
use std::time::Duration;
use tokio::sync::RwLock;

/// Single point of truth for the local replica.
///
/// One reader/writer lock guards the whole FSM: `put`, `delete`,
/// `export_local_state`, `merge_remote_state`, `reap_expired` and
/// `evict_tombstones` take the write half; `get`, `exists` and `list` take
/// the read half. Every operation runs to completion on the calling task
/// and no operation holds the lock across I/O.
#[derive(Debug)]
pub struct StateEngine {
    node_id: String,
    fsm: RwLock<Fsm>,
}

impl StateEngine {
    /// An engine whose local partition is owned by `node_id`.
    pub fn new(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        let fsm = RwLock::new(Fsm::new(node_id.clone()));
        Self { node_id, fsm }
    }

    /// The id of the local node's partition.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Insert or overwrite `key`. Overwriting refreshes the timestamp and
    /// the expiration wherever the key currently lives, peer partitions
    /// included; ownership does not transfer. A zero `expiration` means the
    /// entry never expires.
    pub async fn put(&self, key: &str, value: Vec<u8>, expiration: Option<Duration>) {
        let mut fsm = self.fsm.write().await;
        fsm.put(&self.node_id, key, value, expiration);
    }

    /// The first entry for `key` in partition iteration order. Expired
    /// entries read as absent; tombstones come back as-is and are filtered
    /// by the client layer.
    pub async fn get(&self, key: &str) -> Result<Entry, KvError> {
        let fsm = self.fsm.read().await;
        match fsm.find(key) {
            Some(entry) if entry.is_expired(clock::now_unix_secs()) => Err(KvError::KeyNotFound),
            Some(entry) => Ok(entry.clone()),
            None => Err(KvError::KeyNotFound),
        }
    }

    /// Whether a live, unexpired entry for `key` is present.
    pub async fn exists(&self, key: &str) -> bool {
        let fsm = self.fsm.read().await;
        fsm.find(key)
            .map(|e| e.is_visible(clock::now_unix_secs()))
            .unwrap_or(false)
    }

    /// Every non-expired entry across all partitions, tombstones included.
    pub async fn list(&self) -> Vec<Entry> {
        let fsm = self.fsm.read().await;
        fsm.entries(clock::now_unix_secs())
    }

    /// Tombstone `key` if this node owns it; otherwise a no-op. The
    /// tombstone carries a refreshed timestamp so it overtakes older remote
    /// writes during reconciliation. Returns whether anything changed.
    pub async fn delete(&self, key: &str) -> bool {
        let mut fsm = self.fsm.write().await;
        fsm.delete(&self.node_id, key)
    }

    /// Serialize the full replica for a push/pull exchange. Runs under the
    /// write lock so no reader can observe the FSM mid-mutation while it is
    /// being exported.
    pub async fn export_local_state(&self) -> Vec<u8> {
        let fsm = self.fsm.write().await;
        wire::fsm_to_proto(&fsm).encode_to_vec()
    }

    /// Apply a peer's serialized replica. Undecodable input is logged and
    /// skipped; the local state is never partially overwritten.
    pub async fn merge_remote_state(&self, buf: &[u8]) -> MergeStats {
        let remote = match gossipkv_proto::Fsm::decode(buf) {
            Ok(remote) => remote,
            Err(err) => {
                tracing::warn!("discarding undecodable remote state: {}", err);
                return MergeStats::default();
            }
        };
        let remote = wire::fsm_from_proto(remote);
        let mut fsm = self.fsm.write().await;
        fsm.merge(remote)
    }

    /// Tombstone every expired entry in the local partition so the deletion
    /// propagates. The engine performs no expiry work on its own; the
    /// janitor drives this. Returns the number reaped.
    pub async fn reap_expired(&self) -> usize {
        let now = clock::now_unix_secs();
        let mut fsm = self.fsm.write().await;
        fsm.reap_expired(&self.node_id, now)
    }

    /// Drop locally-owned tombstones older than `max_age`. Returns the
    /// number evicted.
    pub async fn evict_tombstones(&self, max_age: Duration) -> usize {
        let cutoff = clock::now_unix_secs() - max_age.as_secs() as i64;
        let mut fsm = self.fsm.write().await;
        fsm.evict_tombstones(&self.node_id, cutoff)
    }
}
