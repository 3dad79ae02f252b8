//! Multi-instrument exchange: a fixed table of independent order books.

use super::config::ExchangeConfig;
use super::partition::partition_of;
use crate::orderbook::{OrderBook, OrderBookError, Sequencer, Trade, TradeListener};
use parking_lot::{Mutex, RwLock};
use pricelevel::Side;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The exchange owns one [`OrderBook`] per partition and routes every
/// instrument to its partition.
///
/// The book table is allocated once in [`Exchange::new`] and never changes
/// shape afterwards. All books draw order ids from one shared [`Sequencer`].
/// Every trade is forwarded to the exchange trade listener and, unless
/// [`ExchangeConfig::with_trade_log`] turned it off, appended to an in-memory
/// event log. The log only shrinks when [`Exchange::trade_events`] drains it,
/// so a caller that keeps it on must drain it regularly.
pub struct Exchange {
    config: ExchangeConfig,
    books: Box<[OrderBook]>,
    sequencer: Arc<Sequencer>,
    instruments: FxHashSet<String>,
    trade_log: Arc<Mutex<Vec<Trade>>>,
    listener: Arc<RwLock<Option<TradeListener>>>,
}

impl Exchange {
    /// Build the exchange and allocate its book table
    pub fn new(config: ExchangeConfig) -> Result<Self, OrderBookError> {
        config.validate()?;

        let sequencer = Arc::new(Sequencer::new());
        let trade_log: Arc<Mutex<Vec<Trade>>> = Arc::new(Mutex::new(Vec::new()));
        let listener: Arc<RwLock<Option<TradeListener>>> = Arc::new(RwLock::new(None));
        let record_trades = config.record_trades();

        let books: Box<[OrderBook]> = (0..config.partitions())
            .map(|partition| {
                let book = OrderBook::with_sequencer(
                    &format!("partition-{partition}"),
                    Arc::clone(&sequencer),
                );

                let log = Arc::clone(&trade_log);
                let forward = Arc::clone(&listener);
                book.set_trade_listener(Arc::new(move |trade: &Trade| {
                    if record_trades {
                        log.lock().push(trade.clone());
                    }
                    if let Some(listener) = forward.read().as_ref() {
                        listener(trade);
                    }
                }));
                book
            })
            .collect();

        let instruments: FxHashSet<String> = config.instruments().iter().cloned().collect();
        Self::warn_on_collisions(&config);

        info!(
            "Exchange started with {} partitions and {} configured instruments",
            config.partitions(),
            instruments.len()
        );

        Ok(Self {
            config,
            books,
            sequencer,
            instruments,
            trade_log,
            listener,
        })
    }

    fn warn_on_collisions(config: &ExchangeConfig) {
        let mut owners: FxHashMap<usize, &str> = FxHashMap::default();
        for name in config.instruments() {
            let partition = partition_of(name, config.partitions());
            if let Some(other) = owners.insert(partition, name) {
                warn!(
                    "Instruments {} and {} share partition {} and will trade against each other",
                    other, name, partition
                );
            }
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Number of books in the table
    pub fn partitions(&self) -> usize {
        self.books.len()
    }

    /// Index of the book that holds `instrument`
    pub fn partition_of(&self, instrument: &str) -> usize {
        partition_of(instrument, self.books.len())
    }

    /// The book that holds `instrument`
    pub fn book(&self, instrument: &str) -> &OrderBook {
        &self.books[self.partition_of(instrument)]
    }

    /// All books, indexed by partition
    pub fn books(&self) -> &[OrderBook] {
        &self.books
    }

    /// Issue a fresh id from the exchange sequencer
    pub fn next_sequence(&self) -> u64 {
        self.sequencer.next()
    }

    /// Register a callback invoked for every trade on any book
    pub fn set_trade_listener(&self, listener: TradeListener) {
        *self.listener.write() = Some(listener);
    }

    /// Check an incoming order at the boundary
    pub fn validate(&self, instrument: &str, quantity: u64, price: u64) -> Result<(), OrderBookError> {
        if quantity == 0 {
            return Err(OrderBookError::InvalidQuantity(quantity));
        }
        if price == 0 {
            return Err(OrderBookError::InvalidPrice(price));
        }
        self.check_instrument(instrument)
    }

    fn check_instrument(&self, instrument: &str) -> Result<(), OrderBookError> {
        if !self.instruments.is_empty() && !self.instruments.contains(instrument) {
            return Err(OrderBookError::UnknownInstrument(instrument.to_string()));
        }
        Ok(())
    }

    /// Admit an order for `instrument` and return its id.
    ///
    /// With validation enabled the order is checked first; otherwise the
    /// caller guarantees positive quantity and price and a known instrument.
    pub fn submit(
        &self,
        side: Side,
        instrument: &str,
        quantity: u64,
        price: u64,
    ) -> Result<u64, OrderBookError> {
        if self.config.validate_orders() {
            self.validate(instrument, quantity, price)?;
        }

        let order = self.book(instrument).add_order(side, price, quantity);
        debug!(
            "Submitted {} {} {} @ {} as order {}",
            side,
            instrument,
            quantity,
            price,
            order.id()
        );
        Ok(order.id())
    }

    /// Cross the book of `instrument` until it no longer crosses.
    ///
    /// Safe to call from any thread at any time, including concurrently for
    /// the same instrument.
    pub fn run_matching(&self, instrument: &str) -> Result<Vec<Trade>, OrderBookError> {
        if self.config.validate_orders() {
            self.check_instrument(instrument)?;
        }
        self.book(instrument).match_orders()
    }

    /// Run a matching pass on every book, returning the total number of trades
    pub fn run_matching_all(&self) -> Result<usize, OrderBookError> {
        let mut executed = 0;
        for book in self.books.iter() {
            executed += book.match_orders()?.len();
        }
        Ok(executed)
    }

    /// Take every trade recorded since the previous call.
    ///
    /// Trades of one book appear in execution order; trades of different
    /// books interleave in the order their passes ran.
    pub fn trade_events(&self) -> Vec<Trade> {
        std::mem::take(&mut *self.trade_log.lock())
    }

    /// Number of trades waiting in the event log
    pub fn pending_trade_events(&self) -> usize {
        self.trade_log.lock().len()
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("config", &self.config)
            .field("last_sequence", &self.sequencer.last_issued())
            .finish()
    }
}
