//! Typed client surface over the state engine.
//!
//! Every method is a direct projection of an engine operation. This layer
//! adds the value typing (strings, protobuf messages, pluggable codecs) and
//! filters tombstones, so missing, expired and deleted keys all surface as
//! [`KvError::KeyNotFound`].

pub mod codec;

use crate::codec::Codec;
use gossipkv_common::KvError;
use gossipkv_engine::{Entry, StateEngine};
use prost::Message;
use std::sync::Arc;
use std::time::Duration;

/// Expiration argument for puts that should never expire.
pub const NO_EXPIRATION: Option<Duration> = None;

/// Client handle onto the local replica. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    engine: Arc<StateEngine>,
}

impl Client {
    pub fn new(engine: Arc<StateEngine>) -> Self {
        Self { engine }
    }

    /// Store raw bytes under `key`.
    pub async fn put(&self, key: &str, value: Vec<u8>, expiration: Option<Duration>) {
        gossipkv_metrics::metrics().kv_puts.inc();
        let _timer = gossipkv_metrics::start_kv_timer("put");
        self.engine.put(key, value, expiration).await;
    }

    /// Store a UTF-8 string under `key`.
    pub async fn put_string(
        &self,
        key: &str,
        value: impl Into<String>,
        expiration: Option<Duration>,
    ) {
        self.put(key, value.into().into_bytes(), expiration).await;
    }

    /// Store a protobuf message under `key`.
    pub async fn put_proto<M: Message>(&self, key: &str, value: &M, expiration: Option<Duration>) {
        self.put(key, value.encode_to_vec(), expiration).await;
    }

    /// Store an arbitrary value through the supplied codec.
    pub async fn put_any<C: Codec>(
        &self,
        key: &str,
        value: &C::Value,
        codec: &C,
        expiration: Option<Duration>,
    ) -> Result<(), KvError> {
        let bytes = codec.encode(value)?;
        self.put(key, bytes, expiration).await;
        Ok(())
    }

    /// Fetch the visible entry for `key`.
    pub async fn get(&self, key: &str) -> Result<Entry, KvError> {
        gossipkv_metrics::metrics().kv_gets.inc();
        let _timer = gossipkv_metrics::start_kv_timer("get");
        let entry = self.engine.get(key).await?;
        if entry.archived {
            return Err(KvError::KeyNotFound);
        }
        Ok(entry)
    }

    /// Fetch `key` as a UTF-8 string.
    pub async fn get_string(&self, key: &str) -> Result<String, KvError> {
        let entry = self.get(key).await?;
        String::from_utf8(entry.value).map_err(|e| KvError::Serialization(e.to_string()))
    }

    /// Fetch `key` as a protobuf message.
    pub async fn get_proto<M: Message + Default>(&self, key: &str) -> Result<M, KvError> {
        let entry = self.get(key).await?;
        M::decode(entry.value.as_slice()).map_err(|e| KvError::Serialization(e.to_string()))
    }

    /// Fetch `key` through the supplied codec.
    pub async fn get_any<C: Codec>(&self, key: &str, codec: &C) -> Result<C::Value, KvError> {
        let entry = self.get(key).await?;
        codec.decode(&entry.value)
    }

    /// Whether a visible entry exists for `key`.
    pub async fn exists(&self, key: &str) -> bool {
        self.engine.exists(key).await
    }

    /// Tombstone `key` if this node owns it.
    pub async fn delete(&self, key: &str) {
        gossipkv_metrics::metrics().kv_deletes.inc();
        let _timer = gossipkv_metrics::start_kv_timer("delete");
        self.engine.delete(key).await;
    }

    /// Every visible entry in the replica, tombstones filtered.
    pub async fn list(&self) -> Vec<Entry> {
        self.engine
            .list()
            .await
            .into_iter()
            .filter(|e| !e.archived)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Hello {
        #[prost(string, tag = "1")]
        name: String,
    }

    fn client() -> Client {
        Client::new(Arc::new(StateEngine::new("n1")))
    }

    #[tokio::test]
    async fn test_put_string_get_string() {
        let client = client();
        client.put_string("my-key", "my-value", NO_EXPIRATION).await;

        assert!(client.exists("my-key").await);
        assert_eq!(client.get_string("my-key").await.unwrap(), "my-value");
    }

    #[tokio::test]
    async fn test_put_proto_get_proto() {
        let client = client();
        let hello = Hello {
            name: "my-key".to_string(),
        };
        client.put_proto("my-key", &hello, NO_EXPIRATION).await;

        let actual: Hello = client.get_proto("my-key").await.unwrap();
        assert_eq!(actual, hello);

        // The raw entry carries exactly the proto bytes.
        let entry = client.get("my-key").await.unwrap();
        assert_eq!(entry.value, hello.encode_to_vec());
    }

    #[tokio::test]
    async fn test_put_any_get_any_json() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Payload {
            id: u32,
            tags: Vec<String>,
        }

        let client = client();
        let codec = JsonCodec::<Payload>::new();
        let payload = Payload {
            id: 7,
            tags: vec!["a".to_string(), "b".to_string()],
        };

        client
            .put_any("my-key", &payload, &codec, NO_EXPIRATION)
            .await
            .unwrap();
        let actual = client.get_any("my-key", &codec).await.unwrap();
        assert_eq!(actual, payload);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let client = client();
        assert!(matches!(
            client.get("nope").await,
            Err(KvError::KeyNotFound)
        ));
        assert!(matches!(
            client.get_string("nope").await,
            Err(KvError::KeyNotFound)
        ));
        assert!(matches!(
            client.get_proto::<Hello>("nope").await,
            Err(KvError::KeyNotFound)
        ));
    }

    #[tokio::test]
    async fn test_deleted_key_is_not_found() {
        let client = client();
        client.put_string("k", "v", NO_EXPIRATION).await;
        client.delete("k").await;

        assert!(!client.exists("k").await);
        assert!(matches!(client.get("k").await, Err(KvError::KeyNotFound)));
    }

    #[tokio::test]
    async fn test_list_filters_tombstones() {
        let client = client();
        client.put_string("a", "1", NO_EXPIRATION).await;
        client.put_string("b", "2", NO_EXPIRATION).await;
        client.delete("a").await;

        let keys: Vec<String> = client.list().await.into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["b"]);
    }

    #[tokio::test]
    async fn test_get_string_rejects_invalid_utf8() {
        let client = client();
        client.put("k", vec![0xff, 0xfe], NO_EXPIRATION).await;

        assert!(matches!(
            client.get_string("k").await,
            Err(KvError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_get_any_surfaces_codec_errors() {
        let client = client();
        client.put("k", b"not json".to_vec(), NO_EXPIRATION).await;

        let codec = JsonCodec::<Vec<u32>>::new();
        assert!(matches!(
            client.get_any("k", &codec).await,
            Err(KvError::Serialization(_))
        ));
    }
}
