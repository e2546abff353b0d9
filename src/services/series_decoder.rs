//! Series decoder
//!
//! Turns the two daily CSV payloads served by the price feed (one per quote
//! currency) into `PricePoint`s. Each payload is a header row followed by
//! `date,open,high,low,close,adjClose,volume` rows; only `date` and `close`
//! are read.
//!
//! Rows are paired across currencies by date rather than by position, so a
//! day missing from one payload cannot shift every later pairing.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::price_history::{Currency, PricePoint, parse_day};

const DATE_FIELD: usize = 0;
const CLOSE_FIELD: usize = 4;

/// Counters describing one decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Data rows read across both payloads
    pub rows: usize,
    /// Rows dropped because a field could not be parsed
    pub skipped: usize,
    /// Dates present in only one currency's payload
    pub unpaired: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DecodedSeries {
    /// Points in ascending date order
    pub points: Vec<PricePoint>,
    pub stats: DecodeStats,
}

/// Closes of a single currency keyed by day
#[derive(Debug, Clone, Default)]
pub struct CloseSeries {
    pub closes: BTreeMap<NaiveDate, f64>,
    pub rows: usize,
    pub skipped: usize,
}

/// Rounds a close to cents, half away from zero, in decimal arithmetic.
pub fn round_price(value: f64) -> Option<f64> {
    Decimal::from_f64(value)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

fn parse_close(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    round_price(value).filter(|v| *v > 0.0)
}

/// Decodes one currency's payload. Bad rows are skipped, never fatal.
pub fn decode_closes(payload: &str, currency: Currency) -> CloseSeries {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(payload.as_bytes());

    let mut series = CloseSeries::default();

    for (index, result) in reader.records().enumerate() {
        // Header is line 1
        let line = index + 2;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                series.rows += 1;
                series.skipped += 1;
                warn!(currency = %currency, line, error = %e, "Skipping unreadable feed row");
                continue;
            }
        };

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        series.rows += 1;

        let date = record.get(DATE_FIELD).and_then(parse_day);
        let close = record.get(CLOSE_FIELD).and_then(parse_close);

        match (date, close) {
            (Some(date), Some(close)) => {
                if series.closes.insert(date, close).is_some() {
                    debug!(currency = %currency, %date, "Duplicate feed row, keeping the later one");
                }
            }
            _ => {
                series.skipped += 1;
                warn!(
                    currency = %currency,
                    line,
                    date = record.get(DATE_FIELD).unwrap_or(""),
                    close = record.get(CLOSE_FIELD).unwrap_or(""),
                    "Skipping malformed feed row"
                );
            }
        }
    }

    series
}

/// Pairs the USD and INR series of `asset` by date.
pub fn pair_series(asset: &str, usd: CloseSeries, inr: CloseSeries) -> DecodedSeries {
    let mut stats = DecodeStats {
        rows: usd.rows + inr.rows,
        skipped: usd.skipped + inr.skipped,
        unpaired: 0,
    };

    let mut inr_closes = inr.closes;
    let mut points = Vec::with_capacity(usd.closes.len());

    for (date, usd_close) in usd.closes {
        match inr_closes.remove(&date) {
            Some(inr_close) => points.push(PricePoint {
                date,
                asset: asset.to_string(),
                usd: usd_close,
                inr: inr_close,
            }),
            None => {
                stats.unpaired += 1;
                warn!(asset, %date, "No INR close for date, dropping point");
            }
        }
    }

    for date in inr_closes.keys() {
        stats.unpaired += 1;
        warn!(asset, %date, "No USD close for date, dropping point");
    }

    DecodedSeries { points, stats }
}

/// Decodes both payloads and pairs them into points for `asset`.
pub fn decode_series(asset: &str, usd_payload: &str, inr_payload: &str) -> DecodedSeries {
    let usd = decode_closes(usd_payload, Currency::Usd);
    let inr = decode_closes(inr_payload, Currency::Inr);
    pair_series(asset, usd, inr)
}
