//! The expiry/tombstone sweep.
//!
//! Expiry is lazy in the engine: queries evaluate the predicate on read and
//! nothing fires on expiration. This task periodically turns expired
//! locally-owned entries into tombstones, so the deletion propagates to the
//! rest of the cluster, and evicts owned tombstones past their maximum age.

use gossipkv_engine::StateEngine;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Configuration for the janitor background task.
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// How often to sweep. Should be at least the sync interval.
    pub sweep_interval: Duration,
    /// Age past which locally-owned tombstones are evicted.
    pub tombstone_max_age: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            tombstone_max_age: Duration::from_secs(3_600),
        }
    }
}

/// Spawn the janitor background task.
pub fn spawn_janitor_task(
    engine: Arc<StateEngine>,
    config: JanitorConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(config.sweep_interval);
        loop {
            tick.tick().await;
            sweep(&engine, config.tombstone_max_age).await;
        }
    })
}

/// One sweep cycle.
pub async fn sweep(engine: &StateEngine, tombstone_max_age: Duration) {
    let m = gossipkv_metrics::metrics();
    m.janitor_sweeps.inc();

    let reaped = engine.reap_expired().await;
    if reaped > 0 {
        m.expired_reaped.inc_by(reaped as u64);
        tracing::debug!("tombstoned {} expired entries", reaped);
    }

    let evicted = engine.evict_tombstones(tombstone_max_age).await;
    if evicted > 0 {
        m.tombstones_evicted.inc_by(evicted as u64);
        tracing::debug!("evicted {} tombstones", evicted);
    }
}
