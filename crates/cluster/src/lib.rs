//! Cluster host for the gossipkv engine.
//!
//! The engine itself is transport-agnostic behind the
//! [`gossipkv_engine::MembershipDelegate`] seam; this crate ships one
//! working host:
//!
//! - [`transport`]: TCP push/pull exchange of delegate state
//! - [`sync`]: the periodic anti-entropy loop
//! - [`janitor`]: the expiry/tombstone sweep
//! - [`discovery`]: the peer discovery seam and the static provider
//! - [`node`]: wiring of engine, delegate, listener and background tasks

pub mod discovery;
pub mod janitor;
pub mod node;
pub mod sync;
pub mod transport;

pub use node::Node;

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("push/pull frame error: {0}")]
    Frame(String),

    #[error("peer rejected the exchange: {0}")]
    Rejected(String),

    #[error("exchange timed out")]
    Timeout,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("discovery failed: {0}")]
    Discovery(String),
}
