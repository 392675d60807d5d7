//! Periodic catalog maintenance.
//!
//! Sweeps program guide events that ended longer ago than the configured
//! retention. Runs on a fixed interval using `tokio::time::interval`; the
//! catalog work itself is blocking and runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mediacat_core::{CatalogConfig, CatalogError, MediaCatalog};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::metrics::{EPG_ITEMS_SWEPT, MAINTENANCE_RUNS};

/// Run one maintenance pass. Returns the number of events removed.
pub fn run_once(catalog: &MediaCatalog, retention_secs: u64) -> Result<usize, CatalogError> {
    let retention_secs = i64::try_from(retention_secs)
        .unwrap_or(i64::MAX)
        .min(i64::MAX / 1000);
    let cutoff = Utc::now()
        .checked_sub_signed(chrono::Duration::seconds(retention_secs))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    catalog.sweep_expired_epg_items(cutoff)
}

/// Run the maintenance loop until `cancel` is triggered.
pub async fn run(catalog: Arc<MediaCatalog>, config: CatalogConfig, cancel: CancellationToken) {
    info!(
        "Catalog maintenance started (interval {}s, EPG retention {}s)",
        config.maintenance_interval_secs, config.epg_retention_secs
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.maintenance_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Catalog maintenance stopping");
                break;
            }
            _ = interval.tick() => {
                let catalog = Arc::clone(&catalog);
                let retention = config.epg_retention_secs;
                let result = tokio::task::spawn_blocking(move || run_once(&catalog, retention)).await;

                match result {
                    Ok(Ok(removed)) => {
                        MAINTENANCE_RUNS.with_label_values(&["success"]).inc();
                        EPG_ITEMS_SWEPT.inc_by(removed as u64);
                        debug!("Maintenance pass complete ({} events removed)", removed);
                    }
                    Ok(Err(e)) => {
                        MAINTENANCE_RUNS.with_label_values(&["failure"]).inc();
                        error!("Maintenance pass failed: {}", e);
                    }
                    Err(e) => {
                        MAINTENANCE_RUNS.with_label_values(&["failure"]).inc();
                        error!("Maintenance task panicked: {}", e);
                    }
                }
            }
        }
    }
}
