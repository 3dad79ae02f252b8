//! Core OrderBook implementation: one bid chain, one ask chain

use super::chain::OrderChain;
use super::order::OrderEntry;
use super::sequencer::Sequencer;
use super::snapshot::OrderBookSnapshot;
use super::trade::{Trade, TradeListener};
use crate::utils::current_time_millis;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use pricelevel::{Side, UuidGenerator};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::trace;
use uuid::Uuid;

/// The OrderBook holds the resting orders of one instrument partition.
///
/// Orders are added without taking any lock. Matching passes on the same book
/// are serialized by `matching_guard`; they still run concurrently with
/// insertions and with passes on other books.
pub struct OrderBook {
    /// The symbol or identifier for this order book
    pub(super) symbol: String,

    /// Buy orders, best (highest) price first
    pub(super) bids: OrderChain,

    /// Sell orders, best (lowest) price first
    pub(super) asks: OrderChain,

    /// Resting orders by id, entries are dropped when an order retires
    pub(super) orders: DashMap<u64, Arc<OrderEntry>>,

    /// Source of order ids, usually shared with every other book
    sequencer: Arc<Sequencer>,

    /// Generator for unique trade IDs
    pub(super) transaction_id_generator: UuidGenerator,

    /// The last price at which a trade occurred
    pub(super) last_trade_price: AtomicU64,

    /// Flag indicating if there was a trade
    pub(super) has_traded: AtomicBool,

    /// Held for the duration of a matching pass
    pub(super) matching_guard: Mutex<()>,

    pub(super) trade_listener: RwLock<Option<TradeListener>>,

    /// Latest arrival timestamp handed out, keeps timestamps non-decreasing
    pub(super) last_arrival: AtomicU64,
}

impl OrderBook {
    /// Create a new order book for the given symbol with its own sequencer
    pub fn new(symbol: &str) -> Self {
        Self::with_sequencer(symbol, Arc::new(Sequencer::new()))
    }

    /// Create a new order book drawing order ids from a shared sequencer
    pub fn with_sequencer(symbol: &str, sequencer: Arc<Sequencer>) -> Self {
        // Create a unique namespace for this order book's transaction IDs
        let namespace = Uuid::new_v4();

        Self {
            symbol: symbol.to_string(),
            bids: OrderChain::new(Side::Buy),
            asks: OrderChain::new(Side::Sell),
            orders: DashMap::new(),
            sequencer,
            transaction_id_generator: UuidGenerator::new(namespace),
            last_trade_price: AtomicU64::new(0),
            has_traded: AtomicBool::new(false),
            matching_guard: Mutex::new(()),
            trade_listener: RwLock::new(None),
            last_arrival: AtomicU64::new(0),
        }
    }

    /// Get the symbol of this order book
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Register a callback invoked for every trade this book produces
    pub fn set_trade_listener(&self, listener: TradeListener) {
        *self.trade_listener.write() = Some(listener);
    }

    pub fn clear_trade_listener(&self) {
        *self.trade_listener.write() = None;
    }

    /// Admit a new order and thread it into its side of the book.
    ///
    /// Input is assumed valid: positive price and quantity. The order gets the
    /// next sequence number and the current time as its arrival timestamp.
    pub fn add_order(&self, side: Side, price: u64, quantity: u64) -> Arc<OrderEntry> {
        debug_assert!(quantity > 0 && price > 0);

        let id = self.sequencer.next();
        let order = Arc::new(OrderEntry::new(
            id,
            side,
            price,
            quantity,
            self.arrival_timestamp(),
        ));
        trace!(
            "Order book {}: adding order {} {} {} @ {}",
            self.symbol, id, side, quantity, price
        );

        // Indexed before it becomes matchable, so retirement always finds it
        self.orders.insert(id, Arc::clone(&order));
        self.chain(side).insert(Arc::clone(&order));

        order
    }

    /// Wall clock in milliseconds, clamped so it never goes below a
    /// timestamp this book already handed out. The wall clock can step back.
    fn arrival_timestamp(&self) -> u64 {
        let now = current_time_millis();
        self.last_arrival.fetch_max(now, Ordering::AcqRel).max(now)
    }

    pub(super) fn chain(&self, side: Side) -> &OrderChain {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Get the best bid price, if any
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.best().map(|order| order.price())
    }

    /// Get the best ask price, if any
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.best().map(|order| order.price())
    }

    /// Get the mid price (average of best bid and best ask)
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Get the last trade price, if any
    pub fn last_trade_price(&self) -> Option<u64> {
        if self.has_traded.load(Ordering::Acquire) {
            Some(self.last_trade_price.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Get a resting order by id
    pub fn get_order(&self, order_id: u64) -> Option<Arc<OrderEntry>> {
        self.orders
            .get(&order_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Resting buy orders in priority order
    pub fn bids(&self) -> Vec<Arc<OrderEntry>> {
        self.bids.orders()
    }

    /// Resting sell orders in priority order
    pub fn asks(&self) -> Vec<Arc<OrderEntry>> {
        self.asks.orders()
    }

    /// Number of resting orders on both sides
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Total remaining quantity on each side as (bids, asks)
    pub fn total_quantity(&self) -> (u64, u64) {
        (self.bids.total_quantity(), self.asks.total_quantity())
    }

    /// Create a snapshot of the first `depth` orders on each side
    pub fn create_snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let take = |orders: Vec<Arc<OrderEntry>>| {
            orders
                .iter()
                .take(depth)
                .map(|order| order.view())
                .collect::<Vec<_>>()
        };

        OrderBookSnapshot {
            symbol: self.symbol.clone(),
            timestamp: current_time_millis(),
            bids: take(self.bids.orders()),
            asks: take(self.asks.orders()),
        }
    }

    pub(super) fn record_trade(&self, trade: &Trade) {
        self.last_trade_price.store(trade.price, Ordering::Release);
        self.has_traded.store(true, Ordering::Release);

        if let Some(listener) = self.trade_listener.read().as_ref() {
            listener(trade);
        }
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("symbol", &self.symbol)
            .field("bids", &self.bids)
            .field("asks", &self.asks)
            .field("last_trade_price", &self.last_trade_price())
            .finish()
    }
}
