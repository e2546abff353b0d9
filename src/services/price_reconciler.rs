//! Price reconciler
//!
//! Brings the stored history of one asset in line with the feed.
//!
//! - Backfill: fetch everything since `history_start`, then replace the
//!   asset's rows wholesale (delete + insert in one transaction).
//! - Incremental: fetch the feed's default recent window and upsert each
//!   point by (date, asset). Re-running with the same feed output leaves the
//!   store unchanged.
//!
//! Any fetch or store error abandons the pass. Nothing is retried here; the
//! next scheduled pass picks up where this one failed.

use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::price_history::Currency;
use crate::services::price_feed::{FeedError, FeedRange, PriceFeed};
use crate::services::price_store::PriceStore;
use crate::services::series_decoder::{DecodeStats, DecodedSeries, decode_series};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("database error: {0}")]
    Store(#[from] DbErr),

    #[error("backfill for '{0}' decoded no points, keeping existing history")]
    EmptyBackfill(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Backfill,
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Backfill => f.write_str("backfill"),
            SyncMode::Incremental => f.write_str("incremental"),
        }
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub asset: String,
    /// Points produced by the decoder
    pub decoded: usize,
    /// Points inserted or upserted
    pub written: usize,
    /// Rows removed by the backfill purge
    pub deleted: u64,
    pub decode: DecodeStats,
}

#[derive(Clone)]
pub struct PriceReconciler {
    feed: Arc<dyn PriceFeed>,
    store: PriceStore,
    asset: String,
    history_start: DateTime<Utc>,
}

impl PriceReconciler {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        store: PriceStore,
        asset: impl Into<String>,
        history_start: DateTime<Utc>,
    ) -> Self {
        Self {
            feed,
            store,
            asset: asset.into(),
            history_start,
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Fetches both currencies concurrently and pairs them by date.
    async fn fetch_decoded(&self, range: Option<FeedRange>) -> Result<DecodedSeries, SyncError> {
        let (usd, inr) = tokio::try_join!(
            self.feed.fetch_series(Currency::Usd, range),
            self.feed.fetch_series(Currency::Inr, range),
        )?;

        let decoded = decode_series(&self.asset, &usd, &inr);

        if decoded.stats.skipped > 0 || decoded.stats.unpaired > 0 {
            warn!(
                asset = %self.asset,
                skipped = decoded.stats.skipped,
                unpaired = decoded.stats.unpaired,
                "Feed contained rows that could not be stored"
            );
        }

        Ok(decoded)
    }

    /// Replaces the full stored history of the asset with the feed's history
    /// from `history_start` to `now`.
    pub async fn backfill(&self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        let range = FeedRange {
            start: self.history_start,
            end: now,
        };

        info!(asset = %self.asset, start = %range.start, end = %range.end, "Starting price history backfill");

        let decoded = self.fetch_decoded(Some(range)).await?;

        // An empty decode usually means the feed served an error page
        if decoded.points.is_empty() {
            return Err(SyncError::EmptyBackfill(self.asset.clone()));
        }

        let (deleted, written) = self.store.replace_asset(&self.asset, &decoded.points).await?;

        let report = SyncReport {
            mode: SyncMode::Backfill,
            asset: self.asset.clone(),
            decoded: decoded.points.len(),
            written,
            deleted,
            decode: decoded.stats,
        };

        info!(
            asset = %report.asset,
            deleted = report.deleted,
            written = report.written,
            "Price history backfill complete"
        );

        Ok(report)
    }

    /// Upserts the feed's recent window.
    pub async fn sync_recent(&self) -> Result<SyncReport, SyncError> {
        info!(asset = %self.asset, "Starting incremental price sync");

        let decoded = self.fetch_decoded(None).await?;

        let mut written = 0;
        for point in &decoded.points {
            self.store.upsert(point).await?;
            written += 1;
        }

        let report = SyncReport {
            mode: SyncMode::Incremental,
            asset: self.asset.clone(),
            decoded: decoded.points.len(),
            written,
            deleted: 0,
            decode: decoded.stats,
        };

        info!(
            asset = %report.asset,
            written = report.written,
            "Incremental price sync complete"
        );

        Ok(report)
    }

    pub async fn run(&self, mode: SyncMode, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        match mode {
            SyncMode::Backfill => self.backfill(now).await,
            SyncMode::Incremental => self.sync_recent().await,
        }
    }
}
