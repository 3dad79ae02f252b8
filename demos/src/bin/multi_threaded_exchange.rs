use pricelevel::Side;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tickerbook::{Exchange, ExchangeConfig, setup_logger};
use tracing::{error, info, warn};

// Number of threads submitting synthetic orders
const SUBMITTER_COUNT: usize = 6;
// Number of threads running matching passes
const MATCHER_COUNT: usize = 2;
// Duration of the test in seconds
const TEST_DURATION_SECS: u64 = 3;

const TICKERS: [&str; 5] = ["AAPL", "MSFT", "GOOG", "AMZN", "TSLA"];

fn main() {
    setup_logger();
    info!("Multi-threaded Exchange Simulation");
    info!("----------------------------------");
    info!("Submitters: {}", SUBMITTER_COUNT);
    info!("Matchers: {}", MATCHER_COUNT);
    info!("Duration: {} seconds", TEST_DURATION_SECS);

    let config = ExchangeConfig::new()
        .with_partitions(32)
        .with_instruments(TICKERS);
    let exchange = match Exchange::new(config) {
        Ok(exchange) => Arc::new(exchange),
        Err(err) => {
            error!("Could not start exchange: {}", err);
            return;
        }
    };

    run_simulation(exchange);
}

fn run_simulation(exchange: Arc<Exchange>) {
    let barrier = Arc::new(Barrier::new(SUBMITTER_COUNT + MATCHER_COUNT + 1)); // +1 for main thread
    let running = Arc::new(AtomicBool::new(true));
    let passes = Arc::new(AtomicU64::new(0));

    let submitters: Vec<_> = (0..SUBMITTER_COUNT)
        .map(|_| {
            let exchange = Arc::clone(&exchange);
            let barrier = Arc::clone(&barrier);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let mut submitted = Vec::new();
                barrier.wait();

                while running.load(Ordering::Relaxed) {
                    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                    let ticker = TICKERS[rng.gen_range(0..TICKERS.len())];
                    let price = match side {
                        Side::Buy => rng.gen_range(9_950..=10_010),
                        Side::Sell => rng.gen_range(9_990..=10_050),
                    };
                    let quantity = rng.gen_range(1..=20);

                    match exchange.submit(side, ticker, quantity, price) {
                        Ok(id) => submitted.push((id, ticker, quantity)),
                        Err(err) => warn!("Order rejected: {}", err),
                    }
                }
                submitted
            })
        })
        .collect();

    let matchers: Vec<_> = (0..MATCHER_COUNT)
        .map(|matcher_id| {
            let exchange = Arc::clone(&exchange);
            let barrier = Arc::clone(&barrier);
            let running = Arc::clone(&running);
            let passes = Arc::clone(&passes);
            thread::spawn(move || {
                barrier.wait();
                let mut round = matcher_id;
                while running.load(Ordering::Relaxed) {
                    if let Err(err) = exchange.run_matching(TICKERS[round % TICKERS.len()]) {
                        error!("Matching pass failed: {}", err);
                        return;
                    }
                    passes.fetch_add(1, Ordering::Relaxed);
                    round += 1;
                }
            })
        })
        .collect();

    info!("Starting simulation...");
    let start_time = Instant::now();
    barrier.wait();
    thread::sleep(Duration::from_secs(TEST_DURATION_SECS));
    running.store(false, Ordering::Relaxed);

    let mut submitted = Vec::new();
    for handle in submitters {
        match handle.join() {
            Ok(orders) => submitted.extend(orders),
            Err(_) => error!("Submitter thread panicked"),
        }
    }
    for handle in matchers {
        if handle.join().is_err() {
            error!("Matcher thread panicked");
        }
    }

    if let Err(err) = exchange.run_matching_all() {
        error!("Final matching pass failed: {}", err);
    }
    let elapsed = start_time.elapsed();

    let trades = exchange.trade_events();
    info!("\nSimulation Results:");
    info!("-------------------");
    info!("Elapsed: {:?}", elapsed);
    info!("Orders submitted: {}", submitted.len());
    info!("Matching passes: {}", passes.load(Ordering::Relaxed));
    info!("Trades: {}", trades.len());
    info!(
        "Orders per second: {:.2}",
        submitted.len() as f64 / elapsed.as_secs_f64()
    );

    check_conservation(&exchange, &submitted, &trades);
    print_books(&exchange);
}

/// Every unit bought was sold exactly once, and nothing was lost on the way.
fn check_conservation(
    exchange: &Exchange,
    submitted: &[(u64, &'static str, u64)],
    trades: &[tickerbook::Trade],
) {
    let mut filled: HashMap<u64, u64> = HashMap::new();
    for trade in trades {
        *filled.entry(trade.buy_order_id).or_default() += trade.quantity;
        *filled.entry(trade.sell_order_id).or_default() += trade.quantity;
    }

    let mut violations = 0;
    for (id, ticker, original) in submitted {
        let done = filled.get(id).copied().unwrap_or(0);
        let remaining = exchange
            .book(ticker)
            .get_order(*id)
            .map(|order| order.remaining())
            .unwrap_or(0);
        if done + remaining != *original {
            violations += 1;
            error!(
                "Order {}: original {} but filled {} + resting {}",
                id, original, done, remaining
            );
        }
    }

    if violations == 0 {
        info!("Conservation check passed for {} orders", submitted.len());
    } else {
        error!("Conservation check failed for {} orders", violations);
    }
}

fn print_books(exchange: &Exchange) {
    info!("\nBook State After Simulation:");
    for ticker in TICKERS {
        let book = exchange.book(ticker);
        let (bid_quantity, ask_quantity) = book.total_quantity();
        info!(
            "{:<5} {}: best bid {:?}, best ask {:?}, last {:?}, resting {} (bid qty {}, ask qty {})",
            ticker,
            book.symbol(),
            book.best_bid(),
            book.best_ask(),
            book.last_trade_price(),
            book.order_count(),
            bid_quantity,
            ask_quantity
        );
    }
}
