//! # Lock-Free Multi-Instrument Matching Core
//!
//! `tickerbook` is the order-matching core of a multi-instrument exchange
//! simulator. It accepts buy and sell limit orders for any number of
//! instruments, keeps each instrument's resting orders in strict price-time
//! priority, and crosses the best bid against the best ask until the book no
//! longer crosses.
//!
//! ## Key Features
//!
//! - **Lock-Free Insertion**: every side of every book is a singly linked
//!   chain threaded with compare-and-swap. Many threads can add orders to the
//!   same chain at once and readers never observe it out of order.
//!
//! - **Safe Reclamation**: chain nodes are managed by `crossbeam-epoch`, so an
//!   order can be unlinked while other threads are still walking past it.
//!
//! - **Overfill Guard**: remaining quantities are reduced with a
//!   compare-and-swap loop that refuses to go below zero instead of a blind
//!   atomic subtract.
//!
//! - **Head-Only Matching**: a matching pass only inspects and retires the
//!   heads of the two chains, so it costs time proportional to the number of
//!   orders filled, not the depth of the book.
//!
//! - **Partitioned Books**: instruments are hashed onto a fixed table of
//!   independent books allocated up front. Books never contend with each
//!   other.
//!
//! ## Ordering
//!
//! Bids are sorted by descending price, asks by ascending price. Among equal
//! prices the order with the lower sequence number is first. Sequence numbers
//! come from one process-wide [`Sequencer`] and define arrival order, so ties
//! are broken deterministically even when two orders carry the same
//! millisecond timestamp.
//!
//! Trades execute at the resting ask's price.
//!
//! ## Concurrency
//!
//! Insertion never blocks. Matching passes on the same book take turns on a
//! short per-book mutex; passes on different books, and insertions on any
//! book, proceed in parallel. The quantity guard is still enforced on every
//! fill, and a violation aborts the pass with
//! [`OrderBookError::InvariantViolation`] or [`OrderBookError::Overfill`].
//!
//! ## Example
//!
//! ```rust
//! use pricelevel::Side;
//! use tickerbook::{Exchange, ExchangeConfig};
//!
//! let exchange = Exchange::new(ExchangeConfig::new().with_partitions(8)).unwrap();
//!
//! exchange.submit(Side::Buy, "AAPL", 100, 150).unwrap();
//! exchange.submit(Side::Buy, "AAPL", 50, 150).unwrap();
//! exchange.submit(Side::Sell, "AAPL", 80, 145).unwrap();
//!
//! let trades = exchange.run_matching("AAPL").unwrap();
//! assert_eq!(trades.len(), 1);
//! assert_eq!(trades[0].quantity, 80);
//! assert_eq!(trades[0].price, 145);
//! ```
//!
//! ## Status
//! This project is a simulator core. Cancellation, persistence and risk
//! checks are out of scope.

pub mod exchange;
pub mod orderbook;

mod utils;

pub use exchange::{Exchange, ExchangeConfig, partition_of};
pub use orderbook::{
    OrderBook, OrderBookError, OrderBookSnapshot, OrderChain, OrderEntry, OrderView, Sequencer,
    Trade, TradeListener,
};
pub use utils::{current_time_millis, current_time_nanos, setup_logger};
