//! Trade records emitted by matching passes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One execution between a resting buy and a resting sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique id of this execution
    pub trade_id: Uuid,

    /// Symbol of the book the trade happened in
    pub symbol: String,

    pub buy_order_id: u64,
    pub sell_order_id: u64,

    /// Quantity exchanged, always positive
    pub quantity: u64,

    /// Execution price, the resting ask's limit price
    pub price: u64,

    /// Execution time in milliseconds since epoch
    pub timestamp: u64,
}

impl Trade {
    /// Notional value of the trade (price * quantity)
    pub fn notional(&self) -> u64 {
        self.price.saturating_mul(self.quantity)
    }
}

/// Callback invoked for every trade, in execution order per book.
///
/// It runs inside the matching pass of the book that produced the trade, so it
/// must not start another matching pass on that same book.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;
