//! Per-instrument order book: sorted lock-free chains, sequencing and matching.

pub mod book;
pub mod chain;
mod error;
mod matching;
pub mod order;
pub mod sequencer;
mod snapshot;
pub mod trade;

pub use book::OrderBook;
pub use chain::OrderChain;
pub use error::OrderBookError;
pub use order::{OrderEntry, OrderView};
pub use sequencer::Sequencer;
pub use snapshot::OrderBookSnapshot;
pub use trade::{Trade, TradeListener};
