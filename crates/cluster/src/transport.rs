//! TCP push/pull transport.
//!
//! One exchange is a single round trip. The initiator sends a
//! length-prefixed [`PushPull`] frame carrying its serialized local state;
//! the responder answers with its own pre-merge state and then merges the
//! initiator's payload; the initiator merges the response. One exchange
//! therefore pushes and pulls.
//!
//! Frames are `[u32 big-endian length][prost bytes]`. Payloads are opaque
//! delegate bytes; the transport never interprets the replicated state.

use crate::ClusterError;
use gossipkv_engine::MembershipDelegate;
use gossipkv_proto::PushPull;
use prost::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

/// Upper bound on a single state frame.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Identity and handshake settings shared by both sides of an exchange.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub node_name: String,
    pub cookie: String,
    pub exchange_timeout: Duration,
}

async fn read_frame(stream: &mut TcpStream) -> Result<PushPull, ClusterError> {
    let len = stream.read_u32().await?;
    if len > MAX_FRAME_LEN {
        return Err(ClusterError::Frame(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len, MAX_FRAME_LEN
        )));
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    PushPull::decode(buf.as_slice()).map_err(|e| ClusterError::Frame(e.to_string()))
}

async fn write_frame(stream: &mut TcpStream, frame: &PushPull) -> Result<(), ClusterError> {
    let bytes = frame.encode_to_vec();
    stream.write_u32(bytes.len() as u32).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Initiate one push/pull exchange with `peer`.
pub async fn push_pull<D: MembershipDelegate>(
    delegate: &D,
    config: &TransportConfig,
    peer: SocketAddr,
    join: bool,
) -> Result<(), ClusterError> {
    let exchange = async {
        let mut stream = TcpStream::connect(peer).await?;
        let local = delegate.local_state(join).await;
        write_frame(
            &mut stream,
            &PushPull {
                cookie: config.cookie.clone(),
                from: config.node_name.clone(),
                payload: local,
            },
        )
        .await?;

        let reply = read_frame(&mut stream).await?;
        if reply.cookie != config.cookie {
            return Err(ClusterError::Rejected(format!(
                "cookie mismatch from {}",
                reply.from
            )));
        }
        delegate.merge_remote_state(&reply.payload, join).await;
        Ok(())
    };

    timeout(config.exchange_timeout, exchange)
        .await
        .map_err(|_| ClusterError::Timeout)?
}

/// Accept push/pull exchanges until the owning task is aborted.
pub async fn serve<D: MembershipDelegate>(
    listener: TcpListener,
    delegate: Arc<D>,
    config: TransportConfig,
) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!("push/pull accept failed: {}", err);
                continue;
            }
        };
        let delegate = delegate.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let _timer = gossipkv_metrics::start_sync_timer("responder");
            if let Err(err) = respond(stream, delegate.as_ref(), &config).await {
                tracing::debug!("push/pull with {} failed: {}", peer_addr, err);
            }
        });
    }
}

async fn respond<D: MembershipDelegate>(
    mut stream: TcpStream,
    delegate: &D,
    config: &TransportConfig,
) -> Result<(), ClusterError> {
    let exchange = async {
        let request = read_frame(&mut stream).await?;
        if request.cookie != config.cookie {
            return Err(ClusterError::Rejected(format!(
                "cookie mismatch from {}",
                request.from
            )));
        }

        // Export before merging so both sides exchange pre-round state.
        let local = delegate.local_state(false).await;
        write_frame(
            &mut stream,
            &PushPull {
                cookie: config.cookie.clone(),
                from: config.node_name.clone(),
                payload: local,
            },
        )
        .await?;

        delegate.merge_remote_state(&request.payload, false).await;
        Ok(())
    };

    timeout(config.exchange_timeout, exchange)
        .await
        .map_err(|_| ClusterError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipkv_engine::{StateDelegate, StateEngine};

    fn test_config(name: &str, cookie: &str) -> TransportConfig {
        TransportConfig {
            node_name: name.to_string(),
            cookie: cookie.to_string(),
            exchange_timeout: Duration::from_secs(2),
        }
    }

    fn delegate_for(engine: &Arc<StateEngine>) -> Arc<StateDelegate> {
        let meta = gossipkv_proto::NodeMeta {
            name: engine.node_id().to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            discovery_port: 0,
            creation_time: None,
        };
        Arc::new(StateDelegate::new(engine.clone(), meta))
    }

    async fn serve_engine(
        engine: &Arc<StateEngine>,
        cookie: &str,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let delegate = delegate_for(engine);
        let config = test_config(engine.node_id(), cookie);
        let handle = tokio::spawn(serve(listener, delegate, config));
        (addr, handle)
    }

    #[tokio::test]
    async fn test_one_exchange_converges_both_sides() {
        let a = Arc::new(StateEngine::new("n1"));
        let b = Arc::new(StateEngine::new("n2"));
        a.put("ka", b"va".to_vec(), None).await;
        b.put("kb", b"vb".to_vec(), None).await;

        let (addr, server) = serve_engine(&a, "c").await;

        let db = delegate_for(&b);
        push_pull(db.as_ref(), &test_config("n2", "c"), addr, false)
            .await
            .unwrap();

        // The responder merges after replying; give it a beat.
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(b.exists("ka").await, "initiator pulled the responder state");
        assert!(a.exists("kb").await, "responder merged the pushed state");
        server.abort();
    }

    #[tokio::test]
    async fn test_cookie_mismatch_rejects_and_merges_nothing() {
        let a = Arc::new(StateEngine::new("n1"));
        let b = Arc::new(StateEngine::new("n2"));
        b.put("kb", b"vb".to_vec(), None).await;

        let (addr, server) = serve_engine(&a, "right").await;

        let db = delegate_for(&b);
        let err = push_pull(db.as_ref(), &test_config("n2", "wrong"), addr, false).await;
        assert!(err.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!a.exists("kb").await, "rejected payload must not merge");
        server.abort();
    }

    #[tokio::test]
    async fn test_push_pull_to_dead_peer_fails() {
        let b = Arc::new(StateEngine::new("n2"));
        let db = delegate_for(&b);

        // A listener that is bound and immediately dropped leaves a port
        // with nothing accepting on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = push_pull(db.as_ref(), &test_config("n2", "c"), addr, false).await;
        assert!(result.is_err());
    }
}
