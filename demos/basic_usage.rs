//! Basic usage example for lob-replay.
//!
//! Run with: cargo run --example basic_usage

use lob_replay::{format_price, Action, MboEvent, OrderBook, Outcome, Side};

fn print_top(book: &OrderBook) {
    let best = |levels: &[lob_replay::BookLevel]| {
        levels
            .first()
            .map(|l| format!("{} x {} ({} orders)", format_price(l.price), l.size, l.count))
            .unwrap_or_else(|| "-".to_string())
    };
    println!("  Best bid: {}", best(book.get_bids()));
    println!("  Best ask: {}", best(book.get_asks()));
    println!();
}

fn main() {
    println!("=================================================================");
    println!("lob-replay - Basic Usage Example");
    println!("=================================================================\n");

    let mut book = OrderBook::new();
    println!("Created order book (top 10 levels per side)\n");

    // Prices are fixed-point: 5.51 is 55_100
    let events = [
        ("Add BID 100 @ 5.51", MboEvent::new("1001", Action::Add, Side::Bid, 55_100, 100)),
        ("Add ASK 200 @ 5.52", MboEvent::new("2001", Action::Add, Side::Ask, 55_200, 200)),
        ("Add BID 150 @ 5.50", MboEvent::new("1002", Action::Add, Side::Bid, 55_000, 150)),
        ("Sell aggressor trades 50 against 1001", MboEvent::new("1001", Action::Trade, Side::Ask, 55_100, 50)),
        ("Fill acknowledgment (no book change)", MboEvent::new("1001", Action::Fill, Side::Ask, 55_100, 50)),
        ("Cancel unknown order 9999", MboEvent::new("9999", Action::Cancel, Side::Bid, 0, 0)),
        ("Cancel 1001", MboEvent::new("1001", Action::Cancel, Side::Bid, 55_100, 50)),
    ];

    for (i, (label, event)) in events.iter().enumerate() {
        let outcome = book.process(event);
        println!("Event {}: {label}", i + 1);
        match outcome {
            Outcome::Ignored(reason) => println!("  Ignored: {}", reason.as_str()),
            other => println!("  Outcome: {other:?}"),
        }
        println!(
            "  Depth of {} on {:?}: {}",
            format_price(event.price),
            event.side,
            book.get_depth(event.side, event.price)
        );
        print_top(&book);
    }

    book.process(&MboEvent::book_reset());
    println!("After reset: {} live orders", book.order_count());

    let stats = book.stats();
    println!("\nStatistics:");
    println!("  Events:  {}", stats.events_processed);
    println!("  Adds:    {}", stats.adds);
    println!("  Trades:  {}", stats.trades);
    println!("  Cancels: {}", stats.cancels);
    println!("  Ignored: {}", stats.ignored);
}
