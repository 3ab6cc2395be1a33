//! gossipkv-common: shared types for the gossipkv project.
//!
//! Provides the error type shared across the key/value API surface and the
//! wall-clock helpers used for entry timestamping.

pub mod clock;

/// Errors surfaced by the key/value API.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// No visible entry for the requested key. Missing, expired and
    /// tombstoned keys are indistinguishable at the client.
    #[error("key not found")]
    KeyNotFound,

    /// A typed wrapper failed to encode or decode a value payload.
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_message() {
        assert_eq!(KvError::KeyNotFound.to_string(), "key not found");
    }

    #[test]
    fn test_serialization_carries_cause() {
        let err = KvError::Serialization("bad utf-8".to_string());
        assert!(err.to_string().contains("bad utf-8"));
    }
}
