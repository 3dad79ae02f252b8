use criterion::{BenchmarkId, Criterion};
use pricelevel::Side;
use std::hint::black_box;
use tickerbook::OrderBook;

/// Register all benchmarks for adding orders to a book
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("OrderBook - Add Orders");

    // Appending at the tail of one price level
    group.bench_function("add_same_price", |b| {
        b.iter(|| {
            let book = OrderBook::new("TEST-SYMBOL");
            for _ in 0..100 {
                let _ = black_box(book.add_order(Side::Buy, 1000, 10));
            }
        })
    });

    // Inserting into a chain of growing depth at scattered prices
    for order_count in [100u64, 500, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("add_scattered_prices", order_count),
            order_count,
            |b, &order_count| {
                b.iter(|| {
                    let book = OrderBook::new("TEST-SYMBOL");
                    for i in 0..order_count {
                        let price = 1000 + (i * 37) % 200;
                        let _ = black_box(book.add_order(Side::Sell, price, 10));
                    }
                })
            },
        );
    }

    group.finish();
}
