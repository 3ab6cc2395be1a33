//! The partitioned replicated state and its pure write/merge algorithms.
//!
//! Everything in this module is synchronous and lock-free; the async
//! boundary (and the single reader/writer lock) is the caller,
//! [`crate::engine::StateEngine`].

use crate::entry::Entry;
use gossipkv_common::clock;
use std::collections::hash_map::Entry as Slot;
use std::collections::HashMap;
use std::time::Duration;

/// One partition of the replicated state: the entries first written by
/// `node_id`. Only the owning node may tombstone keys in its partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    pub node_id: String,
    pub entries: HashMap<String, Entry>,
}

impl NodeState {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            entries: HashMap::new(),
        }
    }
}

/// Counters describing what one merge applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Partitions adopted verbatim for previously unknown node ids.
    pub partitions_added: usize,
    /// Entries installed from the remote: new keys plus overwrites.
    pub entries_applied: usize,
}

/// The full replica held by one node: a collection of partitions, one per
/// known node id. Node ids are unique and the local node's own partition is
/// always present, even when empty.
///
/// Reads scan partitions in iteration order and take the first match; the
/// order itself is unspecified and callers must not depend on it beyond
/// first-match semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fsm {
    pub node_states: Vec<NodeState>,
}

impl Fsm {
    /// A replica seeded with the local node's empty partition.
    pub fn new(local_node_id: impl Into<String>) -> Self {
        Self {
            node_states: vec![NodeState::new(local_node_id)],
        }
    }

    /// Insert or overwrite `key`.
    ///
    /// If the key already lives in one or more partitions it is overwritten
    /// there, with a fresh timestamp and the new expiration; ownership does
    /// not transfer, and peer partitions holding the key are overwritten
    /// too. Otherwise the key joins `me`'s partition.
    pub fn put(&mut self, me: &str, key: &str, value: Vec<u8>, expiration: Option<Duration>) {
        let entry = Entry::live(key, value, expiration);

        let mut overwritten = false;
        for state in &mut self.node_states {
            if state.entries.contains_key(key) {
                state.entries.insert(key.to_string(), entry.clone());
                overwritten = true;
            }
        }
        if overwritten {
            return;
        }

        if let Some(own) = self.node_states.iter_mut().find(|s| s.node_id == me) {
            own.entries.insert(key.to_string(), entry);
        } else {
            let mut own = NodeState::new(me);
            own.entries.insert(key.to_string(), entry);
            self.node_states.push(own);
        }
    }

    /// First entry for `key` in partition iteration order, regardless of
    /// expiry or tombstone state.
    pub fn find(&self, key: &str) -> Option<&Entry> {
        self.node_states.iter().find_map(|s| s.entries.get(key))
    }

    /// Tombstone `key` if `me`'s partition owns it. Entries for the same key
    /// in other partitions are untouched. Returns whether anything changed.
    pub fn delete(&mut self, me: &str, key: &str) -> bool {
        for state in &mut self.node_states {
            if state.node_id != me {
                continue;
            }
            if let Some(existing) = state.entries.get(key) {
                let mut tombstone = existing.clone();
                tombstone.archived = true;
                tombstone.last_updated_secs = clock::now_unix_secs();
                state.entries.insert(key.to_string(), tombstone);
                return true;
            }
        }
        false
    }

    /// Every non-expired entry across all partitions. Tombstones included;
    /// callers filter them.
    pub fn entries(&self, now_secs: i64) -> Vec<Entry> {
        self.node_states
            .iter()
            .flat_map(|s| s.entries.values())
            .filter(|e| !e.is_expired(now_secs))
            .cloned()
            .collect()
    }

    /// Fuse a remote replica into this one.
    ///
    /// Partitions for unknown node ids are adopted verbatim. Within a shared
    /// partition each key reconciles by whole-second last-writer-wins: a
    /// strictly newer local entry is kept, everything else (ties included)
    /// installs the remote entry. Tombstones are ordinary entries here, so a
    /// newer tombstone supersedes an older live write and vice versa.
    pub fn merge(&mut self, remote: Fsm) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut by_node: HashMap<String, HashMap<String, Entry>> = self
            .node_states
            .drain(..)
            .map(|s| (s.node_id, s.entries))
            .collect();

        for remote_state in remote.node_states {
            match by_node.entry(remote_state.node_id) {
                Slot::Vacant(slot) => {
                    stats.partitions_added += 1;
                    stats.entries_applied += remote_state.entries.len();
                    slot.insert(remote_state.entries);
                }
                Slot::Occupied(mut slot) => {
                    let local = slot.get_mut();
                    for (key, remote_entry) in remote_state.entries {
                        match local.get(&key) {
                            Some(local_entry)
                                if local_entry.last_updated_secs
                                    > remote_entry.last_updated_secs => {}
                            _ => {
                                stats.entries_applied += 1;
                                local.insert(key, remote_entry);
                            }
                        }
                    }
                }
            }
        }

        self.node_states = by_node
            .into_iter()
            .map(|(node_id, entries)| NodeState { node_id, entries })
            .collect();
        stats
    }

    /// Tombstone every expired live entry in `me`'s partition, stamping the
    /// tombstones `now_secs`. Returns the number reaped.
    pub fn reap_expired(&mut self, me: &str, now_secs: i64) -> usize {
        let mut reaped = 0;
        for state in &mut self.node_states {
            if state.node_id != me {
                continue;
            }
            for entry in state.entries.values_mut() {
                if !entry.archived && entry.is_expired(now_secs) {
                    let mut tombstone = entry.clone();
                    tombstone.archived = true;
                    tombstone.last_updated_secs = now_secs;
                    *entry = tombstone;
                    reaped += 1;
                }
            }
        }
        reaped
    }

    /// Drop tombstones from `me`'s partition whose timestamp predates
    /// `cutoff_secs`. Returns the number evicted.
    pub fn evict_tombstones(&mut self, me: &str, cutoff_secs: i64) -> usize {
        let mut evicted = 0;
        for state in &mut self.node_states {
            if state.node_id != me {
                continue;
            }
            let before = state.entries.len();
            state
                .entries
                .retain(|_, e| !(e.archived && e.last_updated_secs < cutoff_secs));
            evicted += before - state.entries.len();
        }
        evicted
    }
}
