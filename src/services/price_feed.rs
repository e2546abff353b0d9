//! Daily price feed client
//!
//! Downloads the CSV history of one quote currency. The reconciler only sees
//! the [`PriceFeed`] trait, so tests can swap in canned payloads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;

use crate::config::FeedConfig;
use crate::models::price_history::Currency;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed returned {status} for {symbol}: {body}")]
    BadStatus {
        symbol: String,
        status: u16,
        body: String,
    },
}

/// Inclusive window of history to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetches the raw CSV payload for `currency`.
    ///
    /// With `range == None` the feed's default (recent) window is returned.
    async fn fetch_series(
        &self,
        currency: Currency,
        range: Option<FeedRange>,
    ) -> Result<String, FeedError>;
}

/// Feed backed by the Yahoo Finance CSV download endpoint
#[derive(Clone)]
pub struct YahooFinanceFeed {
    client: Client,
    base_url: String,
    usd_symbol: String,
    inr_symbol: String,
}

impl YahooFinanceFeed {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            usd_symbol: config.usd_symbol.clone(),
            inr_symbol: config.inr_symbol.clone(),
        }
    }

    pub fn symbol(&self, currency: Currency) -> &str {
        match currency {
            Currency::Usd => &self.usd_symbol,
            Currency::Inr => &self.inr_symbol,
        }
    }

    fn download_url(&self, symbol: &str) -> String {
        format!("{}/v7/finance/download/{}", self.base_url, symbol)
    }
}

/// Query parameters for an explicit history window
pub fn range_params(range: &FeedRange) -> Vec<(&'static str, String)> {
    vec![
        ("period1", range.start.timestamp().to_string()),
        ("period2", range.end.timestamp().to_string()),
        ("interval", "1d".to_string()),
        ("events", "history".to_string()),
        ("includeAdjustedClose", "true".to_string()),
    ]
}

#[async_trait]
impl PriceFeed for YahooFinanceFeed {
    async fn fetch_series(
        &self,
        currency: Currency,
        range: Option<FeedRange>,
    ) -> Result<String, FeedError> {
        let symbol = self.symbol(currency);
        let url = self.download_url(symbol);

        let mut request = self.client.get(&url).header("accept", "text/csv");
        if let Some(range) = &range {
            request = request.query(&range_params(range));
        }

        tracing::debug!(%currency, symbol, ?range, "Fetching price series");

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::BadStatus {
                symbol: symbol.to_string(),
                status,
                body,
            });
        }

        let payload = response.text().await?;

        tracing::debug!(
            %currency,
            symbol,
            bytes = payload.len(),
            "Fetched price series"
        );

        Ok(payload)
    }
}
