//! Contains the core matching engine logic for the order book.

use super::chain::OrderChain;
use super::order::OrderEntry;
use super::trade::Trade;
use crate::utils::current_time_millis;
use crate::{OrderBook, OrderBookError};
use std::sync::Arc;
use tracing::{debug, error, trace};

impl OrderBook {
    /// Cross the best bid against the best ask until the book no longer crosses.
    ///
    /// Each step fills `min(bid.remaining, ask.remaining)` at the ask's price
    /// and retires whichever head was exhausted. Only the heads of the two
    /// chains are ever touched, so a pass costs O(orders filled).
    ///
    /// Passes on the same book take turns on `matching_guard`; a caller that
    /// arrives during a pass waits and then runs its own, so orders that landed
    /// while the earlier pass was running still get crossed. Insertions are
    /// never blocked.
    ///
    /// An error means an internal invariant was broken and the pass was
    /// aborted. Trades executed before the fault were already delivered to the
    /// trade listener.
    pub fn match_orders(&self) -> Result<Vec<Trade>, OrderBookError> {
        let _pass = self.matching_guard.lock();
        let mut trades = Vec::new();

        loop {
            let (bid, ask) = match (self.bids.best(), self.asks.best()) {
                (Some(bid), Some(ask)) => (bid, ask),
                _ => break,
            };

            if bid.price() < ask.price() {
                break;
            }

            let quantity = bid.remaining().min(ask.remaining());
            if quantity == 0 {
                let message = format!(
                    "zero fill between head bid {} ({} left) and head ask {} ({} left)",
                    bid.id(),
                    bid.remaining(),
                    ask.id(),
                    ask.remaining()
                );
                error!("Order book {}: {}", self.symbol, message);
                return Err(OrderBookError::InvariantViolation { message });
            }

            self.fill(&bid, &ask, quantity)?;

            let trade = Trade {
                trade_id: self.transaction_id_generator.next(),
                symbol: self.symbol.clone(),
                buy_order_id: bid.id(),
                sell_order_id: ask.id(),
                quantity,
                price: ask.price(),
                timestamp: current_time_millis(),
            };
            debug!(
                "Order book {}: trade {} buy {} sell {} qty {} @ {}",
                self.symbol,
                trade.trade_id,
                trade.buy_order_id,
                trade.sell_order_id,
                trade.quantity,
                trade.price
            );
            self.record_trade(&trade);
            trades.push(trade);

            self.retire_filled(&self.bids, &bid);
            self.retire_filled(&self.asks, &ask);
        }

        trace!(
            "Order book {}: matching pass done, {} trades",
            self.symbol,
            trades.len()
        );
        Ok(trades)
    }

    /// Take `quantity` off both heads, bid first.
    ///
    /// A refused ask reduction leaves the bid reduced; the state is not
    /// patched back, and the error log names the reduction already applied.
    pub(super) fn fill(
        &self,
        bid: &OrderEntry,
        ask: &OrderEntry,
        quantity: u64,
    ) -> Result<(), OrderBookError> {
        bid.consume(quantity).inspect_err(|err| {
            error!("Order book {}: {}", self.symbol, err);
        })?;
        ask.consume(quantity).inspect_err(|err| {
            error!(
                "Order book {}: {}; bid {} was already reduced by {} to {}",
                self.symbol,
                err,
                bid.id(),
                quantity,
                bid.remaining()
            );
        })?;
        Ok(())
    }

    fn retire_filled(&self, chain: &OrderChain, order: &Arc<OrderEntry>) {
        if order.is_filled() && chain.retire_if_empty(order) {
            self.orders.remove(&order.id());
            trace!(
                "Order book {}: order {} fully filled and retired",
                self.symbol,
                order.id()
            );
        }
    }

    /// True if the best bid is at or above the best ask
    pub fn is_crossed(&self) -> bool {
        matches!(
            (self.best_bid(), self.best_ask()),
            (Some(bid), Some(ask)) if bid >= ask
        )
    }
}
