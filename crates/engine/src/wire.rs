//! Conversion between the domain state and the wire messages.

use crate::entry::Entry;
use crate::fsm::{Fsm, NodeState};
use std::time::Duration;

pub fn entry_to_proto(entry: &Entry) -> gossipkv_proto::Entry {
    gossipkv_proto::Entry {
        key: entry.key.clone(),
        value: entry.value.clone(),
        archived: entry.archived.then_some(true),
        last_updated_time: Some(prost_types::Timestamp {
            seconds: entry.last_updated_secs,
            nanos: 0,
        }),
        expiry: entry.expiry.map(|d| prost_types::Duration {
            seconds: d.as_secs() as i64,
            nanos: d.subsec_nanos() as i32,
        }),
    }
}

pub fn entry_from_proto(entry: gossipkv_proto::Entry) -> Entry {
    Entry {
        key: entry.key,
        value: entry.value,
        archived: entry.archived.unwrap_or(false),
        last_updated_secs: entry.last_updated_time.map(|t| t.seconds).unwrap_or(0),
        expiry: entry.expiry.and_then(duration_from_proto),
    }
}

fn duration_from_proto(d: prost_types::Duration) -> Option<Duration> {
    if d.seconds < 0 {
        return None;
    }
    Some(Duration::new(d.seconds as u64, d.nanos.max(0) as u32))
}

pub fn node_state_to_proto(state: &NodeState) -> gossipkv_proto::NodeState {
    gossipkv_proto::NodeState {
        node_id: state.node_id.clone(),
        entries: state
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), entry_to_proto(e)))
            .collect(),
    }
}

pub fn node_state_from_proto(state: gossipkv_proto::NodeState) -> NodeState {
    NodeState {
        node_id: state.node_id,
        entries: state
            .entries
            .into_iter()
            .map(|(k, e)| (k, entry_from_proto(e)))
            .collect(),
    }
}

pub fn fsm_to_proto(fsm: &Fsm) -> gossipkv_proto::Fsm {
    gossipkv_proto::Fsm {
        node_states: fsm.node_states.iter().map(node_state_to_proto).collect(),
    }
}

pub fn fsm_from_proto(fsm: gossipkv_proto::Fsm) -> Fsm {
    Fsm {
        node_states: fsm
            .node_states
            .into_iter()
            .map(node_state_from_proto)
            .collect(),
    }
}
