//! Replicated state engine for gossipkv.
//!
//! The engine holds one full replica of the cluster's logical state: a set
//! of per-node partitions, each mapping keys to entries. Writes are local;
//! a gossip transport periodically exchanges serialized replicas with a
//! random peer and both sides reconcile with last-writer-wins at per-entry,
//! whole-second granularity.
//!
//! - [`entry`]: the entry record and its visibility predicates
//! - [`fsm`]: the partitioned state and the pure merge/write algorithms
//! - [`engine`]: the synchronized container ([`StateEngine`])
//! - [`wire`]: conversion to and from the wire messages
//! - [`delegate`]: the callback contract exposed to the gossip transport

pub mod delegate;
pub mod engine;
pub mod entry;
pub mod fsm;
pub mod wire;

pub use delegate::{MembershipDelegate, StateDelegate};
pub use engine::StateEngine;
pub use entry::Entry;
pub use fsm::{Fsm, MergeStats, NodeState};
