use pricelevel::Side;
use tickerbook::{Exchange, ExchangeConfig, OrderBookError, setup_logger};
use tracing::{error, info};

fn main() {
    setup_logger();
    info!("Basic Exchange Example");
    info!("======================");

    if let Err(err) = run() {
        error!("Example failed: {}", err);
    }
}

fn run() -> Result<(), OrderBookError> {
    let config = ExchangeConfig::new()
        .with_partitions(16)
        .with_instruments(["AAPL", "MSFT", "GOOG"]);
    let exchange = Exchange::new(config)?;

    partial_fill(&exchange)?;
    fifo_at_equal_price(&exchange)?;
    no_cross(&exchange)?;
    rejected_input(&exchange);

    Ok(())
}

fn partial_fill(exchange: &Exchange) -> Result<(), OrderBookError> {
    info!("\n1. Partial fill at the ask price");
    exchange.submit(Side::Buy, "AAPL", 100, 150)?;
    exchange.submit(Side::Buy, "AAPL", 50, 150)?;
    exchange.submit(Side::Sell, "AAPL", 80, 145)?;

    for trade in exchange.run_matching("AAPL")? {
        info!(
            "Trade: buy {} / sell {} for {} @ {}",
            trade.buy_order_id, trade.sell_order_id, trade.quantity, trade.price
        );
    }
    print_book(exchange, "AAPL")
}

fn fifo_at_equal_price(exchange: &Exchange) -> Result<(), OrderBookError> {
    info!("\n2. Two sells at the same price fill in arrival order");
    exchange.submit(Side::Sell, "MSFT", 30, 100)?;
    exchange.submit(Side::Sell, "MSFT", 30, 100)?;
    exchange.submit(Side::Buy, "MSFT", 60, 100)?;

    let trades = exchange.run_matching("MSFT")?;
    info!("{} trades executed", trades.len());
    print_book(exchange, "MSFT")
}

fn no_cross(exchange: &Exchange) -> Result<(), OrderBookError> {
    info!("\n3. Bid below ask: nothing trades");
    exchange.submit(Side::Buy, "GOOG", 10, 90)?;
    exchange.submit(Side::Sell, "GOOG", 10, 95)?;

    let trades = exchange.run_matching("GOOG")?;
    info!("{} trades executed", trades.len());
    print_book(exchange, "GOOG")
}

fn rejected_input(exchange: &Exchange) {
    info!("\n4. Boundary validation");
    for (instrument, quantity, price) in [("AAPL", 0, 100), ("AAPL", 10, 0), ("NOPE", 10, 100)] {
        match exchange.submit(Side::Buy, instrument, quantity, price) {
            Ok(id) => info!("Unexpectedly accepted as order {}", id),
            Err(err) => info!("Rejected: {}", err),
        }
    }

    let drained = exchange.trade_events();
    info!("Trade events recorded across all books: {}", drained.len());
}

fn print_book(exchange: &Exchange, instrument: &str) -> Result<(), OrderBookError> {
    let book = exchange.book(instrument);
    let snapshot = book.create_snapshot(5);

    info!("{} ({})", instrument, book.symbol());
    for order in &snapshot.bids {
        info!(
            "  BID #{} {} / {} @ {}",
            order.id, order.remaining_quantity, order.original_quantity, order.price
        );
    }
    for order in &snapshot.asks {
        info!(
            "  ASK #{} {} / {} @ {}",
            order.id, order.remaining_quantity, order.original_quantity, order.price
        );
    }
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => info!("  Spread: {}", ask.saturating_sub(bid)),
        (None, None) => info!("  Book is empty"),
        _ => info!("  One side is empty"),
    }
    info!("  JSON: {}", snapshot.to_json()?);
    Ok(())
}
