//! Periodic cache expiry sweep
//!
//! Runs on its own schedule, fully decoupled from request handling. A failed
//! sweep is logged and retried on the next tick; until then the read path's
//! lazy eviction covers expired entries.

use drp_common::CacheStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default interval between sweeps (1 hour)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the background sweep task
pub fn spawn_sweeper(cache: CacheStore, interval: Duration) -> JoinHandle<()> {
    info!("Cache sweeper started (interval {:?})", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(0) => debug!("Cache sweep found nothing to purge"),
                Ok(deleted) => info!("Cache sweep purged {} expired entries", deleted),
                Err(e) => warn!("Cache sweep failed (will retry next tick): {}", e),
            }
        }
    })
}
