#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::sync::Mutex;

use price_history_backend::models::price_history::{Currency, PricePoint};
use price_history_backend::services::price_feed::{FeedError, FeedRange, PriceFeed};

pub const CSV_HEADER: &str = "Date,Open,High,Low,Close,Adj Close,Volume";

/// Set up a fresh in-memory SQLite database with all migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory file.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn point(date: NaiveDate, asset: &str, usd: f64, inr: f64) -> PricePoint {
    PricePoint {
        date,
        asset: asset.to_string(),
        usd,
        inr,
    }
}

/// CSV payload in the feed's layout from (date, close) rows.
pub fn csv_payload(rows: &[(&str, &str)]) -> String {
    let mut payload = String::from(CSV_HEADER);
    for (date, close) in rows {
        payload.push_str(&format!("\n{date},1.0,2.0,0.5,{close},{close},1000"));
    }
    payload
}

/// Feed returning canned payloads and recording the requested ranges.
#[derive(Default)]
pub struct StubFeed {
    usd: Mutex<String>,
    inr: Mutex<String>,
    failing: Mutex<Option<Currency>>,
    requests: Mutex<Vec<(Currency, Option<FeedRange>)>>,
}

impl StubFeed {
    pub fn new(usd: String, inr: String) -> Self {
        let feed = Self::default();
        feed.set_payloads(usd, inr);
        feed
    }

    pub fn set_payloads(&self, usd: String, inr: String) {
        *self.usd.lock().unwrap() = usd;
        *self.inr.lock().unwrap() = inr;
    }

    /// Makes every fetch of `currency` answer with HTTP 503.
    pub fn fail(&self, currency: Option<Currency>) {
        *self.failing.lock().unwrap() = currency;
    }

    pub fn requests(&self) -> Vec<(Currency, Option<FeedRange>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceFeed for StubFeed {
    async fn fetch_series(
        &self,
        currency: Currency,
        range: Option<FeedRange>,
    ) -> Result<String, FeedError> {
        self.requests.lock().unwrap().push((currency, range));

        if *self.failing.lock().unwrap() == Some(currency) {
            return Err(FeedError::BadStatus {
                symbol: format!("BTC-{}", currency.as_str().to_uppercase()),
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }

        let payload = match currency {
            Currency::Usd => self.usd.lock().unwrap().clone(),
            Currency::Inr => self.inr.lock().unwrap().clone(),
        };
        Ok(payload)
    }
}
