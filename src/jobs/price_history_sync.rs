//! Price History Sync Job
//!
//! Runs the one-time backfill at startup, then an incremental sync every
//! `interval`. Passes run one after another on a single task, so they never
//! overlap. A failed pass is logged and left for the next tick.

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::services::price_reconciler::{PriceReconciler, SyncMode, SyncReport};

/// Runs one pass and logs its outcome. Errors never escape.
pub async fn run_sync_pass(reconciler: &PriceReconciler, mode: SyncMode) -> Option<SyncReport> {
    match reconciler.run(mode, Utc::now()).await {
        Ok(report) => {
            info!(
                mode = %report.mode,
                asset = %report.asset,
                decoded = report.decoded,
                written = report.written,
                deleted = report.deleted,
                skipped_rows = report.decode.skipped,
                unpaired = report.decode.unpaired,
                "Price sync pass finished"
            );
            Some(report)
        }
        Err(e) => {
            error!(mode = %mode, asset = %reconciler.asset(), error = %e, "Price sync pass failed");
            None
        }
    }
}

/// Start the price history sync job
///
/// Spawns a background task that:
/// 1. Backfills the full history once (unless disabled)
/// 2. Upserts the recent window every `config.interval`. The cadence is
///    relative to when the job starts, not aligned to wall-clock hours: the
///    first tick fires one interval after startup
/// 3. Exits when `shutdown` flips to `true`
pub fn start_price_history_sync_job(
    reconciler: PriceReconciler,
    config: SyncConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            asset = %reconciler.asset(),
            interval_secs = config.interval.as_secs(),
            backfill = config.backfill_on_startup,
            "Price history sync job started"
        );

        if config.backfill_on_startup {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown requested during backfill, stopping price history sync job");
                    return;
                }
                _ = run_sync_pass(&reconciler, SyncMode::Backfill) => {}
            }
        }

        let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping price history sync job");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    run_sync_pass(&reconciler, SyncMode::Incremental).await;
                }
            }
        }
    })
}
