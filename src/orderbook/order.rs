//! A single resting order and its mutable remaining quantity.

use super::error::OrderBookError;
use pricelevel::Side;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// An order admitted into a book.
///
/// Everything except the remaining quantity is fixed at admission. The
/// remaining quantity only ever goes down, and only through [`OrderEntry::consume`].
#[derive(Debug)]
pub struct OrderEntry {
    id: u64,
    side: Side,
    price: u64,
    timestamp: u64,
    original_quantity: u64,
    remaining: AtomicU64,
}

impl OrderEntry {
    /// Create a new order. `id` is the sequence number issued at admission.
    pub fn new(id: u64, side: Side, price: u64, quantity: u64, timestamp: u64) -> Self {
        Self {
            id,
            side,
            price,
            timestamp,
            original_quantity: quantity,
            remaining: AtomicU64::new(quantity),
        }
    }

    /// Sequence number assigned at admission
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Limit price in ticks
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Arrival time in milliseconds since epoch.
    ///
    /// Non-decreasing among orders of one book, but reporting only: priority
    /// among equal prices follows the id.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn original_quantity(&self) -> u64 {
        self.original_quantity
    }

    /// Quantity still open for matching
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Quantity already executed
    pub fn filled(&self) -> u64 {
        self.original_quantity - self.remaining()
    }

    pub fn is_filled(&self) -> bool {
        self.remaining() == 0
    }

    /// Atomically take `quantity` from the remaining quantity and return what is left.
    ///
    /// This is a compare-and-swap loop rather than a plain `fetch_sub`: the
    /// reduction is only published if the value it was computed from is still
    /// current, and it is refused with [`OrderBookError::Overfill`] when it
    /// would go below zero. Two passes racing on the same order can therefore
    /// never both be credited with the same unit.
    pub fn consume(&self, quantity: u64) -> Result<u64, OrderBookError> {
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if quantity > current {
                return Err(OrderBookError::Overfill {
                    order_id: self.id,
                    requested: quantity,
                    available: current,
                });
            }

            let left = current - quantity;
            match self.remaining.compare_exchange_weak(
                current,
                left,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(left),
                Err(actual) => {
                    trace!(
                        "Order {}: quantity changed from {} to {} during consume, retrying",
                        self.id, current, actual
                    );
                    current = actual;
                }
            }
        }
    }

    /// Price-time priority: true if `self` must sit ahead of `other` in a chain of its side.
    ///
    /// Better price wins; at equal price the lower sequence number (earlier
    /// arrival) wins. Sequence numbers are unique, so this is a strict total order.
    pub fn ranks_before(&self, other: &OrderEntry) -> bool {
        match self.side {
            Side::Buy => {
                self.price > other.price || (self.price == other.price && self.id < other.id)
            }
            Side::Sell => {
                self.price < other.price || (self.price == other.price && self.id < other.id)
            }
        }
    }

    /// Point-in-time copy of this order
    pub fn view(&self) -> OrderView {
        OrderView {
            id: self.id,
            side: self.side,
            price: self.price,
            timestamp: self.timestamp,
            original_quantity: self.original_quantity,
            remaining_quantity: self.remaining(),
        }
    }
}

/// Serializable copy of an [`OrderEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: u64,
    pub side: Side,
    pub price: u64,
    pub timestamp: u64,
    pub original_quantity: u64,
    pub remaining_quantity: u64,
}
