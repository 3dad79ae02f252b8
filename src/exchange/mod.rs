//! Multi-instrument surface: configuration, partitioning and the exchange.

pub mod config;
mod engine;
pub mod partition;

pub use config::ExchangeConfig;
pub use engine::Exchange;
pub use partition::partition_of;
