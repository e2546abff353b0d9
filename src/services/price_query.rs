//! Price query service
//!
//! Validates end-user filters and turns them into store queries.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DbErr;
use serde_json::Value;
use thiserror::Error;

use crate::models::price_history::{
    Currency, DEFAULT_ASSET, DateFilter, Limit, PriceFilter, PriceHistoryEntry, PriceHistoryQuery,
    PriceLookupRequest, parse_day,
};
use crate::services::price_store::PriceStore;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Store(#[from] DbErr),
}

fn parse_date_param(name: &str, value: &str) -> Result<NaiveDate, QueryError> {
    parse_day(value).ok_or_else(|| {
        QueryError::Validation(format!(
            "Invalid {} date: '{}'. Use YYYY-MM-DD",
            name, value
        ))
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl PriceHistoryQuery {
    /// Validates the raw query string.
    ///
    /// `on` takes precedence over `from`/`to`: when it is present the range
    /// bounds are ignored.
    pub fn validate(&self) -> Result<PriceFilter, QueryError> {
        let from = non_empty(&self.from)
            .map(|v| parse_date_param("from", v))
            .transpose()?;
        let to = non_empty(&self.to)
            .map(|v| parse_date_param("to", v))
            .transpose()?;
        let on = non_empty(&self.on)
            .map(|v| parse_date_param("on", v))
            .transpose()?;

        let dates = match (on, from, to) {
            (Some(day), from, to) => {
                if from.is_some() || to.is_some() {
                    tracing::warn!(%day, ?from, ?to, "Both 'on' and a date range given, using 'on'");
                }
                DateFilter::On(day)
            }
            (None, None, None) => DateFilter::Any,
            (None, from, to) => DateFilter::Range { from, to },
        };

        let currency = non_empty(&self.currency)
            .map(|v| {
                Currency::parse(&v.to_lowercase()).ok_or_else(|| {
                    QueryError::Validation(format!(
                        "Invalid currency: '{}'. Must be one of: usd, inr",
                        v
                    ))
                })
            })
            .transpose()?;

        let limit = match non_empty(&self.limit) {
            Some(v) => Limit::parse(v).ok_or_else(|| {
                QueryError::Validation(format!(
                    "Invalid limit: '{}'. Must be a non-negative number or 'all'",
                    v
                ))
            })?,
            None => Limit::default(),
        };

        // Assets are stored lowercase
        let asset = non_empty(&self.asset)
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_ASSET.to_string());

        Ok(PriceFilter {
            asset,
            dates,
            currency,
            limit,
        })
    }
}

fn parse_lookup_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
        }
        Value::String(s) => parse_day(s),
        _ => None,
    }
}

impl PriceLookupRequest {
    /// Extracts the requested days. Accepts epoch milliseconds, `YYYY-MM-DD`
    /// and RFC 3339 strings.
    pub fn validate(&self) -> Result<Vec<NaiveDate>, QueryError> {
        let dates = match &self.dates {
            None | Some(Value::Null) => {
                return Err(QueryError::Validation("dates is required".to_string()));
            }
            Some(Value::Array(dates)) => dates,
            Some(_) => {
                return Err(QueryError::Validation("dates must be an array".to_string()));
            }
        };

        dates
            .iter()
            .map(|value| {
                parse_lookup_date(value).ok_or_else(|| {
                    QueryError::Validation(format!("Invalid date in dates: {}", value))
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PriceQueryService {
    store: PriceStore,
}

impl PriceQueryService {
    pub fn new(store: PriceStore) -> Self {
        Self { store }
    }

    /// Filtered history, newest first, projected to the requested currency.
    pub async fn history(&self, filter: &PriceFilter) -> Result<Vec<PriceHistoryEntry>, QueryError> {
        let rows = self.store.query(filter).await?;

        tracing::debug!(
            asset = %filter.asset,
            count = rows.len(),
            "Price history query completed"
        );

        Ok(rows
            .into_iter()
            .map(|row| PriceHistoryEntry::project(row, filter.currency))
            .collect())
    }

    /// Every stored point (any asset) on one of `dates`, in store order.
    pub async fn lookup(&self, dates: &[NaiveDate]) -> Result<Vec<PriceHistoryEntry>, QueryError> {
        let rows = self.store.find_by_dates(dates).await?;

        Ok(rows
            .into_iter()
            .map(|row| PriceHistoryEntry::project(row, None))
            .collect())
    }
}
