//! Exchange configuration.
//!
//! [`ExchangeConfig`] fixes the size of the book table and, optionally, the
//! set of instruments the exchange accepts.

use crate::OrderBookError;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::env;

/// Number of books allocated when nothing else is configured
pub const DEFAULT_PARTITIONS: usize = 64;

/// Environment variable holding the partition count
pub const PARTITIONS_ENV: &str = "TICKERBOOK_PARTITIONS";

/// Environment variable holding a comma separated instrument list
pub const INSTRUMENTS_ENV: &str = "TICKERBOOK_INSTRUMENTS";

/// Configuration for an [`Exchange`](crate::Exchange)
///
/// # Example
///
/// ```rust
/// use tickerbook::ExchangeConfig;
///
/// let config = ExchangeConfig::new()
///     .with_partitions(16)
///     .with_instruments(["AAPL", "MSFT"]);
/// assert_eq!(config.partitions(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Number of independent books, fixed for the lifetime of the exchange
    partitions: usize,

    /// Accepted instruments; empty means any instrument is accepted
    instruments: Vec<String>,

    /// Whether `submit` checks price, quantity and instrument
    validate_orders: bool,

    /// Whether trades are kept in the exchange event log until drained
    #[serde(default = "default_record_trades")]
    record_trades: bool,
}

fn default_record_trades() -> bool {
    true
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS,
            instruments: Vec::new(),
            validate_orders: true,
            record_trades: true,
        }
    }
}

impl ExchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from `TICKERBOOK_PARTITIONS` and
    /// `TICKERBOOK_INSTRUMENTS`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, OrderBookError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ExchangeConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OrderBookError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(PARTITIONS_ENV) {
            let partitions =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|err| OrderBookError::InvalidConfiguration {
                        message: format!("{PARTITIONS_ENV}={raw}: {err}"),
                    })?;
            config.partitions = partitions;
        }

        if let Some(raw) = lookup(INSTRUMENTS_ENV) {
            config.instruments = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the number of books
    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Restrict the exchange to these instruments
    #[must_use]
    pub fn with_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    /// Turn boundary validation in `submit` on or off
    #[must_use]
    pub fn with_validation(mut self, validate_orders: bool) -> Self {
        self.validate_orders = validate_orders;
        self
    }

    /// Keep or skip the exchange event log. With it off, trades only reach
    /// the trade listener and the callers of `run_matching`.
    #[must_use]
    pub fn with_trade_log(mut self, record_trades: bool) -> Self {
        self.record_trades = record_trades;
        self
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn validate_orders(&self) -> bool {
        self.validate_orders
    }

    pub fn record_trades(&self) -> bool {
        self.record_trades
    }

    /// Check the configuration can back an exchange
    pub fn validate(&self) -> Result<(), OrderBookError> {
        if self.partitions == 0 {
            return Err(OrderBookError::InvalidConfiguration {
                message: "partition count must be positive".to_string(),
            });
        }

        let mut seen = FxHashSet::default();
        for name in &self.instruments {
            if name.is_empty() {
                return Err(OrderBookError::InvalidConfiguration {
                    message: "empty instrument name".to_string(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(OrderBookError::InvalidConfiguration {
                    message: format!("duplicate instrument {name}"),
                });
            }
        }

        Ok(())
    }
}
