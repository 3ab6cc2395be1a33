//! Wire messages for gossipkv.
//!
//! These are the payloads of the anti-entropy push/pull exchange and the
//! node-identity broadcast. Field numbers are part of the wire contract and
//! must not be reassigned.

use std::collections::HashMap;

/// A single key/value record as replicated across the cluster.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Entry {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    /// Tombstone marker; absent means live.
    #[prost(bool, optional, tag = "3")]
    pub archived: Option<bool>,
    /// Refreshed on every mutation, including tombstoning.
    #[prost(message, optional, tag = "4")]
    pub last_updated_time: Option<::prost_types::Timestamp>,
    /// Absent means the entry never expires.
    #[prost(message, optional, tag = "5")]
    pub expiry: Option<::prost_types::Duration>,
}

/// One replica partition: the entries first written by `node_id`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeState {
    #[prost(string, tag = "1")]
    pub node_id: String,
    #[prost(map = "string, message", tag = "2")]
    pub entries: HashMap<String, Entry>,
}

/// The full replicated state shipped during a push/pull exchange.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fsm {
    #[prost(message, repeated, tag = "1")]
    pub node_states: Vec<NodeState>,
}

/// Node identity advertised to peers in alive broadcasts.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeMeta {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub host: String,
    #[prost(uint32, tag = "3")]
    pub port: u32,
    #[prost(uint32, tag = "4")]
    pub discovery_port: u32,
    #[prost(message, optional, tag = "5")]
    pub creation_time: Option<::prost_types::Timestamp>,
}

/// Transport frame for one side of a push/pull exchange. The payload is
/// opaque to the transport: it carries whatever the delegate exported.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushPull {
    #[prost(string, tag = "1")]
    pub cookie: String,
    #[prost(string, tag = "2")]
    pub from: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_absent_archived_decodes_as_none() {
        let entry = Entry {
            key: "k".to_string(),
            value: b"v".to_vec(),
            archived: None,
            last_updated_time: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 0,
            }),
            expiry: None,
        };
        let decoded = Entry::decode(entry.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.archived, None);
        assert_eq!(decoded.expiry, None);
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_fsm_with_entry_map_survives_the_wire() {
        let mut entries = HashMap::new();
        entries.insert(
            "k1".to_string(),
            Entry {
                key: "k1".to_string(),
                value: b"v1".to_vec(),
                archived: Some(true),
                last_updated_time: Some(prost_types::Timestamp {
                    seconds: 1_700_000_001,
                    nanos: 0,
                }),
                expiry: Some(prost_types::Duration {
                    seconds: 60,
                    nanos: 0,
                }),
            },
        );
        let fsm = Fsm {
            node_states: vec![NodeState {
                node_id: "127.0.0.1:4400".to_string(),
                entries,
            }],
        };

        let decoded = Fsm::decode(fsm.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.node_states.len(), 1);
        let entry = &decoded.node_states[0].entries["k1"];
        assert_eq!(entry.archived, Some(true));
        assert_eq!(entry.expiry.as_ref().map(|d| d.seconds), Some(60));
    }

    #[test]
    fn test_empty_fsm_encodes_to_nothing() {
        // A default FSM is indistinguishable from an empty buffer, which is
        // what makes a zero-valued merge a no-op.
        assert!(Fsm::default().encode_to_vec().is_empty());
    }
}
