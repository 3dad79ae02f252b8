//! Order book snapshot for market data

use super::error::OrderBookError;
use super::order::OrderView;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A snapshot of the order book state at a specific point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// The symbol or identifier for this order book
    pub symbol: String,

    /// Timestamp when the snapshot was created (milliseconds since epoch)
    pub timestamp: u64,

    /// Resting buy orders, best first
    pub bids: Vec<OrderView>,

    /// Resting sell orders, best first
    pub asks: Vec<OrderView>,
}

impl OrderBookSnapshot {
    /// Get the best bid price and its remaining quantity
    pub fn best_bid(&self) -> Option<(u64, u64)> {
        let bid = self
            .bids
            .first()
            .map(|order| (order.price, order.remaining_quantity));
        trace!("best_bid: {:?}", bid);
        bid
    }

    /// Get the best ask price and its remaining quantity
    pub fn best_ask(&self) -> Option<(u64, u64)> {
        let ask = self
            .asks
            .first()
            .map(|order| (order.price, order.remaining_quantity));
        trace!("best_ask: {:?}", ask);
        ask
    }

    /// Get the mid price (average of best bid and best ask)
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid_price, _)), Some((ask_price, _))) => {
                Some((bid_price as f64 + ask_price as f64) / 2.0)
            }
            _ => None,
        }
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid_price, _)), Some((ask_price, _))) => {
                Some(ask_price.saturating_sub(bid_price))
            }
            _ => None,
        }
    }

    /// Calculate the total remaining volume on the bid side
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|order| order.remaining_quantity).sum()
    }

    /// Calculate the total remaining volume on the ask side
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|order| order.remaining_quantity).sum()
    }

    /// Render the snapshot as JSON
    pub fn to_json(&self) -> Result<String, OrderBookError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot previously produced by [`OrderBookSnapshot::to_json`]
    pub fn from_json(json: &str) -> Result<Self, OrderBookError> {
        Ok(serde_json::from_str(json)?)
    }
}
