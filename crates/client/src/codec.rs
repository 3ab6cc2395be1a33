//! Pluggable value codecs for `put_any`/`get_any`.

use gossipkv_common::KvError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Encode and decode arbitrary payload types onto the opaque entry value.
/// The engine never looks inside the bytes.
pub trait Codec {
    type Value;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, KvError>;
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, KvError>;
}

/// JSON codec for any serde-capable type.
pub struct JsonCodec<T> {
    _marker: PhantomData<T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, KvError> {
        serde_json::to_vec(value).map_err(|e| KvError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, KvError> {
        serde_json::from_slice(bytes).map_err(|e| KvError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec::<Vec<String>>::new();
        let value = vec!["x".to_string(), "y".to_string()];

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_json_codec_decode_failure() {
        let codec = JsonCodec::<u64>::new();
        assert!(matches!(
            codec.decode(b"{oops"),
            Err(KvError::Serialization(_))
        ));
    }
}
