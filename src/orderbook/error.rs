//! Order book error types

use thiserror::Error;

/// Errors that can occur within an order book or the exchange around it.
///
/// Contention between threads is never reported here: failed compare-and-swap
/// attempts are retried inside the chains. Only rejected input and broken
/// internal invariants reach the caller.
#[derive(Debug, Error)]
pub enum OrderBookError {
    /// Order quantity must be strictly positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u64),

    /// Order price must be strictly positive
    #[error("Invalid price: {0}")]
    InvalidPrice(u64),

    /// The instrument is not configured on this exchange
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// A fill would drive an order's remaining quantity below zero
    #[error("Overfill on order {order_id}: requested {requested}, available {available}")]
    Overfill {
        /// Order whose quantity was being reduced
        order_id: u64,
        /// Quantity the caller tried to take
        requested: u64,
        /// Quantity that was actually left
        available: u64,
    },

    /// Internal consistency fault, the book can no longer be trusted
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// Description of the broken invariant
        message: String,
    },

    /// Rejected exchange configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem
        message: String,
    },

    /// Snapshot or trade could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
