//! Multi-threaded stress tests: concurrent submission and matching on shared books.

#[cfg(test)]
mod tests {
    use pricelevel::Side;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tickerbook::{Exchange, ExchangeConfig, OrderBook, OrderEntry};

    const TICKERS: [&str; 3] = ["AAPL", "MSFT", "GOOG"];

    fn is_sorted(orders: &[Arc<OrderEntry>]) -> bool {
        orders.windows(2).all(|pair| pair[0].ranks_before(&pair[1]))
    }

    #[test]
    fn test_concurrent_submit_and_match_conserves_quantity() {
        let exchange = Arc::new(Exchange::new(ExchangeConfig::new().with_partitions(8)).unwrap());
        let submitters = 4;
        let matchers = 3;
        let per_thread = 400u64;
        let barrier = Arc::new(Barrier::new(submitters + matchers));
        let running = Arc::new(AtomicBool::new(true));

        let submit_handles: Vec<_> = (0..submitters)
            .map(|t| {
                let exchange = Arc::clone(&exchange);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut submitted = Vec::with_capacity(per_thread as usize);
                    for i in 0..per_thread {
                        let side = if (i + t as u64) % 2 == 0 {
                            Side::Buy
                        } else {
                            Side::Sell
                        };
                        let ticker = TICKERS[(i as usize + t) % TICKERS.len()];
                        let price = 95 + (i * 7 + t as u64) % 11;
                        let quantity = 1 + (i * 3 + t as u64) % 9;
                        let id = exchange.submit(side, ticker, quantity, price).unwrap();
                        submitted.push((id, quantity));
                    }
                    submitted
                })
            })
            .collect();

        let match_handles: Vec<_> = (0..matchers)
            .map(|t| {
                let exchange = Arc::clone(&exchange);
                let barrier = Arc::clone(&barrier);
                let running = Arc::clone(&running);
                thread::spawn(move || {
                    barrier.wait();
                    let mut round = t;
                    while running.load(Ordering::Relaxed) {
                        exchange
                            .run_matching(TICKERS[round % TICKERS.len()])
                            .unwrap();
                        round += 1;
                    }
                })
            })
            .collect();

        let mut submitted = HashMap::new();
        for handle in submit_handles {
            for (id, quantity) in handle.join().unwrap() {
                assert!(submitted.insert(id, quantity).is_none(), "duplicate id {id}");
            }
        }
        running.store(false, Ordering::Relaxed);
        for handle in match_handles {
            handle.join().unwrap();
        }

        // Settle whatever crossed after the matchers stopped
        for ticker in TICKERS {
            exchange.run_matching(ticker).unwrap();
        }

        let mut filled: HashMap<u64, u64> = HashMap::new();
        let trades = exchange.trade_events();
        for trade in &trades {
            assert!(trade.quantity > 0);
            *filled.entry(trade.buy_order_id).or_default() += trade.quantity;
            *filled.entry(trade.sell_order_id).or_default() += trade.quantity;
        }

        for (id, original) in &submitted {
            let done = filled.get(id).copied().unwrap_or(0);
            assert!(done <= *original, "order {id} oversold: {done} > {original}");

            let resting = TICKERS
                .iter()
                .find_map(|ticker| exchange.book(ticker).get_order(*id));
            match resting {
                Some(order) => assert_eq!(order.remaining(), original - done),
                None => assert_eq!(done, *original, "order {id} vanished unfilled"),
            }
        }

        for ticker in TICKERS {
            let book = exchange.book(ticker);
            assert!(!book.is_crossed());
            assert!(is_sorted(&book.bids()));
            assert!(is_sorted(&book.asks()));
        }
    }

    #[test]
    fn test_readers_never_see_unsorted_chain() {
        let book = Arc::new(OrderBook::new("SORT"));
        let writers = 4;
        let barrier = Arc::new(Barrier::new(writers + 1));
        let running = Arc::new(AtomicBool::new(true));

        let reader = {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                barrier.wait();
                let mut observations = 0u64;
                while running.load(Ordering::Relaxed) {
                    assert!(is_sorted(&book.bids()));
                    assert!(is_sorted(&book.asks()));
                    observations += 1;
                }
                observations
            })
        };

        let handles: Vec<_> = (0..writers)
            .map(|t| {
                let book = Arc::clone(&book);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..500u64 {
                        let price = 1000 + (i * 31 + t as u64 * 17) % 40;
                        book.add_order(Side::Buy, price, 1);
                        book.add_order(Side::Sell, price + 100, 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        running.store(false, Ordering::Relaxed);
        assert!(reader.join().unwrap() > 0);

        assert_eq!(book.bids().len(), writers * 500);
        assert_eq!(book.asks().len(), writers * 500);
    }

    #[test]
    fn test_same_price_priority_under_concurrency() {
        let book = Arc::new(OrderBook::new("FIFO"));
        let writers = 8;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|_| {
                let book = Arc::clone(&book);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..200 {
                        book.add_order(Side::Sell, 250, 1);
                    }
                    200usize
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // A single buy sweeps the whole level; fills must come out in id order
        book.add_order(Side::Buy, 250, total as u64);
        let trades = book.match_orders().unwrap();

        assert_eq!(trades.len(), total);
        assert!(
            trades
                .windows(2)
                .all(|pair| pair[0].sell_order_id < pair[1].sell_order_id)
        );
        assert!(book.is_empty());
    }
}
