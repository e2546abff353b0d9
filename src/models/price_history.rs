//! Price history request/response models
//!
//! Types shared by the sync pipeline and the `/price-history` endpoints.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::price_history;

/// Asset served when a request does not name one
pub const DEFAULT_ASSET: &str = "btc";

/// Result cap applied when `limit` is omitted
pub const DEFAULT_LIMIT: u64 = 100;

/// Quote currency of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Usd,
    Inr,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Inr => "inr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "usd" => Some(Currency::Usd),
            "inr" => Some(Currency::Inr),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a calendar day from `YYYY-MM-DD` or an RFC 3339 timestamp
/// (truncated to its UTC day).
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// A decoded daily close for one asset in both currencies.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub asset: String,
    pub usd: f64,
    pub inr: f64,
}

/// Maximum number of rows a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Capped(u64),
    Unbounded,
}

impl Limit {
    /// Parses `all`, `0` (both unbounded) or a non-negative integer that
    /// fits a SQL `BIGINT`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Some(Limit::Unbounded);
        }
        match s.parse::<i64>().ok()? {
            0 => Some(Limit::Unbounded),
            n => u64::try_from(n).ok().map(Limit::Capped),
        }
    }

    pub fn as_option(&self) -> Option<u64> {
        match self {
            Limit::Capped(n) => Some(*n),
            Limit::Unbounded => None,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Capped(DEFAULT_LIMIT)
    }
}

/// Date constraint of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    Any,
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    On(NaiveDate),
}

/// Validated filter for `GET /price-history`
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFilter {
    pub asset: String,
    pub dates: DateFilter,
    pub currency: Option<Currency>,
    pub limit: Limit,
}

impl Default for PriceFilter {
    fn default() -> Self {
        Self {
            asset: DEFAULT_ASSET.to_string(),
            dates: DateFilter::Any,
            currency: None,
            limit: Limit::default(),
        }
    }
}

/// Raw query string of `GET /price-history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceHistoryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub on: Option<String>,
    pub limit: Option<String>,
    pub asset: Option<String>,
    pub currency: Option<String>,
}

/// Body of `POST /price-history`
///
/// `dates` stays untyped so that "missing" and "not an array" can be told apart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceLookupRequest {
    #[serde(default)]
    pub dates: Option<serde_json::Value>,
}

/// One row of a price history response. Fields outside the requested
/// currency projection are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inr: Option<f64>,
}

impl PriceHistoryEntry {
    pub fn project(model: price_history::Model, currency: Option<Currency>) -> Self {
        Self {
            date: model.date.and_time(NaiveTime::MIN).and_utc(),
            usd: (currency != Some(Currency::Inr)).then_some(model.usd),
            inr: (currency != Some(Currency::Usd)).then_some(model.inr),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> price_history::Model {
        price_history::Model {
            id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            asset: "btc".to_string(),
            usd: 62431.5,
            inr: 5175012.25,
        }
    }

    #[test]
    fn test_parse_day() {
        let day = NaiveDate::from_ymd_opt(2021, 7, 4).unwrap();
        assert_eq!(parse_day("2021-07-04"), Some(day));
        assert_eq!(parse_day(" 2021-07-04 "), Some(day));
        assert_eq!(parse_day("2021-07-04T00:00:00.000Z"), Some(day));
        assert_eq!(parse_day("2021-07-04T23:30:00-02:00"), Some(day.succ_opt().unwrap()));
        assert_eq!(parse_day("07/04/2021"), None);
        assert_eq!(parse_day(""), None);
    }

    #[test]
    fn test_limit_parse() {
        assert_eq!(Limit::parse("all"), Some(Limit::Unbounded));
        assert_eq!(Limit::parse("ALL"), Some(Limit::Unbounded));
        assert_eq!(Limit::parse("0"), Some(Limit::Unbounded));
        assert_eq!(Limit::parse("25"), Some(Limit::Capped(25)));
        assert_eq!(Limit::parse("-3"), None);
        assert_eq!(Limit::parse("ten"), None);
        assert_eq!(
            Limit::parse("9223372036854775807"),
            Some(Limit::Capped(i64::MAX as u64))
        );
        assert_eq!(Limit::parse("9223372036854775808"), None);
        assert_eq!(Limit::parse("18446744073709551615"), None);
        assert_eq!(Limit::default(), Limit::Capped(100));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
        assert_eq!(Currency::parse("inr"), Some(Currency::Inr));
        assert_eq!(Currency::parse("eur"), None);
    }

    #[test]
    fn test_projection_usd_only() {
        let entry = PriceHistoryEntry::project(model(), Some(Currency::Usd));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["usd"], 62431.5);
        assert!(json.get("inr").is_none());
        assert!(json.get("asset").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_projection_inr_only() {
        let entry = PriceHistoryEntry::project(model(), Some(Currency::Inr));
        assert_eq!(entry.usd, None);
        assert_eq!(entry.inr, Some(5175012.25));
    }

    #[test]
    fn test_projection_both_and_midnight_date() {
        let entry = PriceHistoryEntry::project(model(), None);
        assert_eq!(entry.usd, Some(62431.5));
        assert_eq!(entry.inr, Some(5175012.25));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2024-03-01T00:00:00Z");
    }
}
