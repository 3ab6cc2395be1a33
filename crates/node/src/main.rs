//! gossipkv-node: entry point for a gossip-replicated KV node.
//!
//! Loads config, wires the state engine into the push/pull cluster host,
//! then runs until interrupted.

use gossipkv_cluster::discovery::StaticProvider;
use gossipkv_cluster::Node;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gossipkv_metrics::init_tracing();

    // Load config: first CLI arg is the YAML config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    let config =
        gossipkv_config::load_from_file(std::path::Path::new(&config_path)).unwrap_or_else(|e| {
            tracing::warn!(
                "failed to load config from {}: {}, using defaults",
                config_path,
                e
            );
            // Minimal default: listen on 127.0.0.1:4400
            gossipkv_config::load_from_str("listen: \"127.0.0.1:4400\"\nseeds: []\n")
                .expect("hardcoded default config must parse")
        });

    // Spawn metrics HTTP server if configured
    if let Some(metrics_port) = config.metrics_port {
        let metrics_addr: std::net::SocketAddr = format!("0.0.0.0:{}", metrics_port)
            .parse()
            .expect("valid metrics address");
        tokio::spawn(async move {
            if let Err(e) = gossipkv_metrics::serve_metrics(metrics_addr).await {
                tracing::warn!("metrics server failed: {}", e);
            }
        });
    }

    let discovery = Arc::new(StaticProvider::from_strings(&config.seeds));
    let node = Node::start(config, discovery).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, shutting down");
    node.stop().await;

    Ok(())
}
