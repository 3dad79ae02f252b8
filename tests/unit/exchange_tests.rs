//! Routing, validation and trade event tests for the exchange.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pricelevel::Side;
    use std::sync::Arc;
    use tickerbook::{Exchange, ExchangeConfig, OrderBookError, Trade, partition_of};

    #[test]
    fn test_zero_partitions_rejected() {
        let result = Exchange::new(ExchangeConfig::new().with_partitions(0));
        assert!(matches!(
            result,
            Err(OrderBookError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_book_table_is_fixed() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(10)).unwrap();
        assert_eq!(exchange.partitions(), 10);
        assert_eq!(exchange.books().len(), 10);
        assert_eq!(exchange.books()[3].symbol(), "partition-3");
    }

    #[test]
    fn test_same_ticker_same_book() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(32)).unwrap();
        let partition = exchange.partition_of("AAPL");
        assert_eq!(partition, partition_of("AAPL", 32));
        assert!(std::ptr::eq(exchange.book("AAPL"), exchange.book("AAPL")));
        assert!(std::ptr::eq(
            exchange.book("AAPL"),
            &exchange.books()[partition]
        ));
    }

    #[test]
    fn test_instruments_are_independent() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(1024)).unwrap();
        let a = "AAPL";
        let b = ["MSFT", "GOOG", "TSLA", "AMZN", "NFLX"]
            .into_iter()
            .find(|ticker| exchange.partition_of(ticker) != exchange.partition_of(a))
            .unwrap();

        exchange.submit(Side::Buy, a, 10, 100).unwrap();
        exchange.submit(Side::Sell, b, 10, 90).unwrap();

        assert!(exchange.run_matching(a).unwrap().is_empty());
        assert!(exchange.run_matching(b).unwrap().is_empty());
    }

    #[test]
    fn test_validation_rejects_bad_orders() {
        let exchange = Exchange::new(
            ExchangeConfig::new()
                .with_partitions(8)
                .with_instruments(["AAPL", "MSFT"]),
        )
        .unwrap();

        assert!(matches!(
            exchange.submit(Side::Buy, "AAPL", 0, 100),
            Err(OrderBookError::InvalidQuantity(0))
        ));
        assert!(matches!(
            exchange.submit(Side::Buy, "AAPL", 10, 0),
            Err(OrderBookError::InvalidPrice(0))
        ));
        assert!(matches!(
            exchange.submit(Side::Buy, "NOPE", 10, 100),
            Err(OrderBookError::UnknownInstrument(name)) if name == "NOPE"
        ));
        assert!(matches!(
            exchange.run_matching("NOPE"),
            Err(OrderBookError::UnknownInstrument(_))
        ));
        assert!(exchange.submit(Side::Buy, "MSFT", 10, 100).is_ok());
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let exchange = Exchange::new(
            ExchangeConfig::new()
                .with_partitions(8)
                .with_instruments(["AAPL"])
                .with_validation(false),
        )
        .unwrap();

        assert!(exchange.submit(Side::Buy, "ANYTHING", 10, 100).is_ok());
        assert!(exchange.run_matching("ANYTHING").is_ok());
    }

    #[test]
    fn test_submit_ids_increase_across_instruments() {
        let exchange = Exchange::new(ExchangeConfig::new()).unwrap();
        let a = exchange.submit(Side::Buy, "AAPL", 1, 100).unwrap();
        let b = exchange.submit(Side::Sell, "MSFT", 1, 100).unwrap();
        let c = exchange.next_sequence();
        let d = exchange.submit(Side::Buy, "GOOG", 1, 100).unwrap();
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn test_trade_events_drain_in_order() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(4)).unwrap();
        exchange.submit(Side::Sell, "AAPL", 10, 100).unwrap();
        exchange.submit(Side::Sell, "AAPL", 10, 101).unwrap();
        exchange.submit(Side::Buy, "AAPL", 20, 101).unwrap();

        let returned = exchange.run_matching("AAPL").unwrap();
        assert_eq!(exchange.pending_trade_events(), 2);

        let events = exchange.trade_events();
        assert_eq!(events, returned);
        assert_eq!(events[0].price, 100);
        assert_eq!(events[1].price, 101);

        assert!(exchange.trade_events().is_empty());
    }

    #[test]
    fn test_trade_log_can_be_switched_off() {
        let exchange = Exchange::new(
            ExchangeConfig::new()
                .with_partitions(4)
                .with_trade_log(false),
        )
        .unwrap();
        let seen: Arc<Mutex<Vec<Trade>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        exchange.set_trade_listener(Arc::new(move |trade: &Trade| {
            sink.lock().push(trade.clone());
        }));

        for _ in 0..50 {
            exchange.submit(Side::Sell, "AAPL", 1, 100).unwrap();
            exchange.submit(Side::Buy, "AAPL", 1, 100).unwrap();
        }
        let returned = exchange.run_matching("AAPL").unwrap();

        assert_eq!(returned.len(), 50);
        assert_eq!(seen.lock().len(), 50);
        assert_eq!(exchange.pending_trade_events(), 0);
        assert!(exchange.trade_events().is_empty());
    }

    #[test]
    fn test_exchange_trade_listener() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(4)).unwrap();
        let seen: Arc<Mutex<Vec<Trade>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        exchange.set_trade_listener(Arc::new(move |trade: &Trade| {
            sink.lock().push(trade.clone());
        }));

        exchange.submit(Side::Buy, "AAPL", 5, 100).unwrap();
        exchange.submit(Side::Sell, "AAPL", 5, 100).unwrap();
        exchange.run_matching("AAPL").unwrap();

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].quantity, 5);
    }

    #[test]
    fn test_run_matching_all() {
        let exchange = Exchange::new(ExchangeConfig::new().with_partitions(64)).unwrap();
        for ticker in ["AAPL", "MSFT", "GOOG"] {
            exchange.submit(Side::Buy, ticker, 5, 100).unwrap();
            exchange.submit(Side::Sell, ticker, 5, 100).unwrap();
        }

        assert_eq!(exchange.run_matching_all().unwrap(), 3);
        assert!(exchange.books().iter().all(|book| book.is_empty()));
    }
}
