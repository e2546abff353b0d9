//! Process configuration read from the environment
//!
//! `main` loads `.env` through dotenvy before calling [`Config::from_env`].

use chrono::{DateTime, Utc};
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::models::price_history::DEFAULT_ASSET;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_HOST: &str = "HOST";
const ENV_PORT: &str = "PORT";
const ENV_FEED_BASE_URL: &str = "PRICE_FEED_BASE_URL";
const ENV_FEED_USD_SYMBOL: &str = "PRICE_FEED_USD_SYMBOL";
const ENV_FEED_INR_SYMBOL: &str = "PRICE_FEED_INR_SYMBOL";
const ENV_ASSET: &str = "PRICE_ASSET";
const ENV_HISTORY_START: &str = "PRICE_HISTORY_START";
const ENV_SYNC_INTERVAL: &str = "PRICE_SYNC_INTERVAL_SECS";
const ENV_BACKFILL_ON_STARTUP: &str = "PRICE_BACKFILL_ON_STARTUP";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FEED_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_USD_SYMBOL: &str = "BTC-USD";
const DEFAULT_INR_SYMBOL: &str = "BTC-INR";

/// First day of BTC history on the feed (2014-09-17)
const DEFAULT_HISTORY_START_SECS: i64 = 1_410_912_000;

/// Incremental sync cadence (4 hours)
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 14_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub base_url: String,
    pub usd_symbol: String,
    pub inr_symbol: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            usd_symbol: DEFAULT_USD_SYMBOL.to_string(),
            inr_symbol: DEFAULT_INR_SYMBOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Asset the feed symbols describe, stored lowercase
    pub asset: String,
    /// Lower bound of the backfill window
    pub history_start: DateTime<Utc>,
    pub interval: Duration,
    pub backfill_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            asset: DEFAULT_ASSET.to_string(),
            history_start: DateTime::from_timestamp(DEFAULT_HISTORY_START_SECS, 0)
                .unwrap_or_default(),
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            backfill_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub feed: FeedConfig,
    pub sync: SyncConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get(ENV_DATABASE_URL).ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;

        let port = match get(ENV_PORT) {
            Some(v) => parse_value(ENV_PORT, &v)?,
            None => DEFAULT_PORT,
        };

        let defaults = SyncConfig::default();

        let history_start = match get(ENV_HISTORY_START) {
            Some(v) => {
                let secs: i64 = parse_value(ENV_HISTORY_START, &v)?;
                DateTime::from_timestamp(secs, 0).ok_or(ConfigError::Invalid {
                    name: ENV_HISTORY_START,
                    value: v,
                })?
            }
            None => defaults.history_start,
        };

        let interval = match get(ENV_SYNC_INTERVAL) {
            Some(v) => {
                let secs: u64 = parse_value(ENV_SYNC_INTERVAL, &v)?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: ENV_SYNC_INTERVAL,
                        value: v,
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.interval,
        };

        let backfill_on_startup = match get(ENV_BACKFILL_ON_STARTUP) {
            Some(v) => parse_bool(ENV_BACKFILL_ON_STARTUP, &v)?,
            None => defaults.backfill_on_startup,
        };

        let feed_defaults = FeedConfig::default();

        Ok(Self {
            database_url,
            host: get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            feed: FeedConfig {
                base_url: get(ENV_FEED_BASE_URL).unwrap_or(feed_defaults.base_url),
                usd_symbol: get(ENV_FEED_USD_SYMBOL).unwrap_or(feed_defaults.usd_symbol),
                inr_symbol: get(ENV_FEED_INR_SYMBOL).unwrap_or(feed_defaults.inr_symbol),
            },
            sync: SyncConfig {
                asset: get(ENV_ASSET)
                    .map(|asset| asset.trim().to_lowercase())
                    .unwrap_or(defaults.asset),
                history_start,
                interval,
                backfill_on_startup,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap();
        assert_eq!(config.database_url, "postgres://db");
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.sync.asset, "btc");
        assert_eq!(config.sync.history_start.timestamp(), 1_410_912_000);
        assert_eq!(config.sync.interval, Duration::from_secs(4 * 60 * 60));
        assert!(config.sync.backfill_on_startup);
    }

    #[test]
    fn test_missing_database_url() {
        assert_eq!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("PRICE_FEED_USD_SYMBOL", "ETH-USD"),
            ("PRICE_ASSET", "ETH"),
            ("PRICE_SYNC_INTERVAL_SECS", "60"),
            ("PRICE_BACKFILL_ON_STARTUP", "false"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.feed.usd_symbol, "ETH-USD");
        assert_eq!(config.feed.inr_symbol, "BTC-INR");
        assert_eq!(config.sync.asset, "eth");
        assert_eq!(config.sync.interval, Duration::from_secs(60));
        assert!(!config.sync.backfill_on_startup);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "x"),
            ("PRICE_SYNC_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PRICE_SYNC_INTERVAL_SECS", .. }));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "x"),
            ("PRICE_BACKFILL_ON_STARTUP", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
