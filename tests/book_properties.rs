//! Property-based tests for order book invariants.
//!
//! Random event sequences (adds, cancels, trades, fills, resets, with
//! reused and unknown order ids) must always leave the book consistent:
//!
//! - Level aggregates equal the sum of the live orders at that price
//! - No resident level is empty
//! - Snapshots are the best N levels, strictly ordered
//! - Depth counts exactly the levels strictly better than a price
//! - Ignored events change nothing

use std::collections::HashMap;

use lob_replay::{Action, BookConfig, BookLevel, MboEvent, Order, OrderBook, Outcome, Side};
use proptest::prelude::*;

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask), Just(Side::None)]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => Just(Action::Add),
        3 => Just(Action::Cancel),
        3 => Just(Action::Trade),
        1 => Just(Action::Fill),
        1 => Just(Action::Unknown),
        1 => Just(Action::Reset),
    ]
}

/// Small id and price ranges so collisions (shared levels, reused ids) are common.
fn arb_event() -> impl Strategy<Value = MboEvent> {
    (arb_action(), 0u32..24, arb_side(), 0i64..30, 0u32..40).prop_map(
        |(action, id, side, tick, size)| {
            let order_id = if id == 0 { String::new() } else { id.to_string() };
            MboEvent::new(order_id, action, side, 10_000 + tick * 25, size)
        },
    )
}

fn quiet_book(levels: usize) -> OrderBook {
    OrderBook::with_config(BookConfig::new(levels).with_logging(false))
}

/// Aggregate live orders by (side, price).
fn expected_levels(book: &OrderBook) -> HashMap<(Side, i64), (u64, u32)> {
    let mut levels = HashMap::new();
    for order in book.get_orders().values() {
        let entry = levels.entry((order.side, order.price)).or_insert((0u64, 0u32));
        entry.0 += u64::from(order.size);
        entry.1 += 1;
    }
    levels
}

fn sorted_orders(book: &OrderBook) -> Vec<(String, Order)> {
    let mut orders: Vec<(String, Order)> = book
        .get_orders()
        .iter()
        .map(|(id, order)| (id.clone(), *order))
        .collect();
    orders.sort_by(|a, b| a.0.cmp(&b.0));
    orders
}

fn resident_levels(book: &OrderBook, side: Side) -> Vec<BookLevel> {
    book.levels(side).copied().collect()
}

fn check_invariants(book: &OrderBook) -> Result<(), TestCaseError> {
    let expected = expected_levels(book);
    let mut seen = 0;

    for side in [Side::Bid, Side::Ask] {
        let levels = resident_levels(book, side);

        for level in &levels {
            prop_assert!(level.size > 0 && level.count > 0, "empty level {:?}", level);
            prop_assert_eq!(
                expected.get(&(side, level.price)).copied(),
                Some((level.size, level.count))
            );
        }
        seen += levels.len();

        let top = book.top(side);
        let n = levels.len().min(book.config().levels);
        prop_assert_eq!(top, &levels[..n]);
        prop_assert_eq!(book.level_count(side), levels.len());

        let ordered = match side {
            Side::Bid => top.windows(2).all(|w| w[0].price > w[1].price),
            _ => top.windows(2).all(|w| w[0].price < w[1].price),
        };
        prop_assert!(ordered);
    }

    prop_assert_eq!(seen, expected.len());
    for order in book.get_orders().values() {
        prop_assert!(order.size > 0);
        prop_assert!(order.side != Side::None);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_book_stays_consistent(events in prop::collection::vec(arb_event(), 1..200)) {
        let mut book = quiet_book(10);
        for event in &events {
            book.process(event);
            check_invariants(&book)?;
        }
    }

    #[test]
    fn prop_consistent_with_shallow_snapshots(events in prop::collection::vec(arb_event(), 1..120)) {
        let mut book = quiet_book(3);
        for event in &events {
            book.process(event);
            check_invariants(&book)?;
        }
    }

    #[test]
    fn prop_ignored_events_change_nothing(events in prop::collection::vec(arb_event(), 1..150)) {
        let mut book = quiet_book(10);
        for event in &events {
            let before = book.snapshot();
            let orders_before = sorted_orders(&book);

            let outcome = book.process(event);

            if matches!(outcome, Outcome::Ignored(_) | Outcome::NoOp) {
                prop_assert_eq!(book.snapshot(), before);
                prop_assert_eq!(sorted_orders(&book), orders_before.clone());
            }
        }
    }

    #[test]
    fn prop_depth_counts_better_levels(
        events in prop::collection::vec(arb_event(), 1..150),
        probe in 9_900i64..10_900,
    ) {
        let mut book = quiet_book(10);
        for event in &events {
            book.process(event);
        }

        let bid_depth = resident_levels(&book, Side::Bid).iter().filter(|l| l.price > probe).count();
        let ask_depth = resident_levels(&book, Side::Ask).iter().filter(|l| l.price < probe).count();

        prop_assert_eq!(book.get_depth(Side::Bid, probe) as usize, bid_depth);
        prop_assert_eq!(book.get_depth(Side::Ask, probe) as usize, ask_depth);
        prop_assert_eq!(book.get_depth(Side::None, probe), 0);
    }

    #[test]
    fn prop_reset_empties_book(events in prop::collection::vec(arb_event(), 0..100)) {
        let mut book = quiet_book(10);
        for event in &events {
            book.process(event);
        }

        prop_assert_eq!(book.process(&MboEvent::book_reset()), Outcome::Cleared);
        prop_assert!(book.is_empty());
        prop_assert!(book.get_bids().is_empty());
        prop_assert!(book.get_asks().is_empty());
        prop_assert_eq!(book.stats().active_orders, 0);
    }

    #[test]
    fn prop_change_detection_matches_snapshots(events in prop::collection::vec(arb_event(), 1..150)) {
        let mut book = quiet_book(10);
        for event in &events {
            let before = book.snapshot();
            book.process(event);
            let after = book.snapshot();
            prop_assert_eq!(book.changed_since(&before), before != after);
        }
    }
}
