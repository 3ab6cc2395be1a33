//! Metrics and tracing setup for gossipkv.
//!
//! Provides a global [`NodeMetrics`] singleton backed by the `prometheus`
//! crate, plus an optional lightweight HTTP server for Prometheus scraping.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::OnceLock;

// ────────────────────────── Tracing ──────────────────────────

/// Initialize the tracing subscriber with env-filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// ────────────────────────── Prometheus metrics ──────────────────────────

/// Global metrics instance.
static METRICS: OnceLock<NodeMetrics> = OnceLock::new();

/// Retrieve (or lazily create) the global metrics singleton.
pub fn metrics() -> &'static NodeMetrics {
    METRICS.get_or_init(NodeMetrics::new)
}

/// All Prometheus metrics for a gossipkv node.
pub struct NodeMetrics {
    pub registry: Registry,

    // ── KV operation counters ──
    pub kv_puts: IntCounter,
    pub kv_gets: IntCounter,
    pub kv_deletes: IntCounter,

    // ── KV operation latency ──
    pub kv_latency_secs: HistogramVec,

    // ── Anti-entropy ──
    pub sync_rounds: IntCounter,
    pub sync_failures: IntCounter,
    pub sync_latency_secs: HistogramVec,
    pub merge_entries: IntCounter,
    pub merge_partitions: IntCounter,

    // ── Janitor ──
    pub janitor_sweeps: IntCounter,
    pub expired_reaped: IntCounter,
    pub tombstones_evicted: IntCounter,
}

// Manual Debug impl because prometheus types don't derive Debug.
impl std::fmt::Debug for NodeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMetrics").finish_non_exhaustive()
    }
}

/// Default histogram buckets (seconds) for KV/sync latency.
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

impl NodeMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
            let c = IntCounter::with_opts(Opts::new(name, help)).expect("counter opts");
            registry.register(Box::new(c.clone())).expect("register counter");
            c
        }

        fn histogram(
            registry: &Registry,
            name: &str,
            help: &str,
            labels: &[&str],
        ) -> HistogramVec {
            let h = HistogramVec::new(
                HistogramOpts::new(name, help).buckets(LATENCY_BUCKETS.to_vec()),
                labels,
            )
            .expect("histogram opts");
            registry
                .register(Box::new(h.clone()))
                .expect("register histogram");
            h
        }

        let kv_puts = counter(&registry, "gossipkv_kv_puts_total", "KV put operations");
        let kv_gets = counter(&registry, "gossipkv_kv_gets_total", "KV get operations");
        let kv_deletes = counter(
            &registry,
            "gossipkv_kv_deletes_total",
            "KV delete operations",
        );
        let kv_latency_secs = histogram(
            &registry,
            "gossipkv_kv_latency_seconds",
            "KV operation latency in seconds",
            &["op_type"],
        );

        let sync_rounds = counter(
            &registry,
            "gossipkv_sync_rounds_total",
            "Completed push/pull rounds",
        );
        let sync_failures = counter(
            &registry,
            "gossipkv_sync_failures_total",
            "Failed push/pull rounds",
        );
        let sync_latency_secs = histogram(
            &registry,
            "gossipkv_sync_latency_seconds",
            "Push/pull exchange latency in seconds",
            &["role"],
        );
        let merge_entries = counter(
            &registry,
            "gossipkv_merge_entries_total",
            "Entries installed from remote replicas",
        );
        let merge_partitions = counter(
            &registry,
            "gossipkv_merge_partitions_added_total",
            "Partitions adopted for previously unknown peers",
        );

        let janitor_sweeps = counter(
            &registry,
            "gossipkv_janitor_sweeps_total",
            "Janitor sweep cycles",
        );
        let expired_reaped = counter(
            &registry,
            "gossipkv_expired_reaped_total",
            "Expired entries turned into tombstones",
        );
        let tombstones_evicted = counter(
            &registry,
            "gossipkv_tombstones_evicted_total",
            "Tombstones evicted past their maximum age",
        );

        Self {
            registry,
            kv_puts,
            kv_gets,
            kv_deletes,
            kv_latency_secs,
            sync_rounds,
            sync_failures,
            sync_latency_secs,
            merge_entries,
            merge_partitions,
            janitor_sweeps,
            expired_reaped,
            tombstones_evicted,
        }
    }
}

/// Encode all registered metrics in Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let m = metrics();
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&m.registry.gather(), &mut buf)
        .expect("prometheus text encoding");
    String::from_utf8(buf).expect("prometheus output is valid UTF-8")
}

/// Start a KV operation latency timer. Records elapsed time on drop.
pub fn start_kv_timer(op_type: &str) -> prometheus::HistogramTimer {
    metrics()
        .kv_latency_secs
        .with_label_values(&[op_type])
        .start_timer()
}

/// Start a push/pull latency timer for one side of an exchange.
pub fn start_sync_timer(role: &str) -> prometheus::HistogramTimer {
    metrics()
        .sync_latency_secs
        .with_label_values(&[role])
        .start_timer()
}

// ────────────────────────── Metrics HTTP server ──────────────────────────

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

async fn metrics_handler(
    _req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let body = encode_metrics();
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .expect("valid HTTP response"))
}

/// Serve Prometheus metrics on the given address (`GET /metrics`).
///
/// This spawns a lightweight HTTP/1.1 server. Call from a `tokio::spawn`.
pub async fn serve_metrics(
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("metrics server listening on http://{}/metrics", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(metrics_handler))
                .await
            {
                tracing::debug!("metrics connection error: {}", e);
            }
        });
    }
}

// ────────────────────────── Tests ──────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Histogram;

    #[test]
    fn test_metrics_init_and_increment() {
        let m = metrics();

        let before = m.kv_puts.get();
        m.kv_puts.inc();
        m.kv_puts.inc();
        assert_eq!(m.kv_puts.get(), before + 2);

        let before_sync = m.sync_rounds.get();
        m.sync_rounds.inc();
        assert_eq!(m.sync_rounds.get(), before_sync + 1);

        m.merge_entries.inc_by(5);
        m.janitor_sweeps.inc();
        m.tombstones_evicted.inc();
    }

    #[test]
    fn test_encode_metrics_format() {
        metrics().expired_reaped.inc();

        let output = encode_metrics();
        assert!(output.contains("gossipkv_kv_puts_total"));
        assert!(output.contains("gossipkv_expired_reaped_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_histogram_records() {
        let m = metrics();

        m.sync_latency_secs
            .with_label_values(&["test_role"])
            .observe(0.005);
        m.sync_latency_secs
            .with_label_values(&["test_role"])
            .observe(0.010);

        let h: Histogram = m.sync_latency_secs.with_label_values(&["test_role"]);
        assert_eq!(h.get_sample_count(), 2);
        assert!((h.get_sample_sum() - 0.015).abs() < 1e-9);
    }

    #[test]
    fn test_kv_timer_observes_on_drop() {
        let timer = start_kv_timer("test_op");
        drop(timer);

        let h: Histogram = metrics().kv_latency_secs.with_label_values(&["test_op"]);
        assert!(h.get_sample_count() >= 1);
    }
}
