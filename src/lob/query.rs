//! Read-only queries over a book: depth of a price and change detection.

use serde::{Deserialize, Serialize};

use super::book::OrderBook;
use super::price_level::BookLevel;
use crate::types::Side;

/// Owned copy of both top-of-book snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bids, highest first
    pub bids: Vec<BookLevel>,
    /// Asks, lowest first
    pub asks: Vec<BookLevel>,
}

impl BookSnapshot {
    /// Copy the current snapshots out of a book.
    pub fn capture(book: &OrderBook) -> Self {
        Self {
            bids: book.get_bids().to_vec(),
            asks: book.get_asks().to_vec(),
        }
    }

    /// Whether either side differs from `other`.
    #[inline]
    pub fn differs_from(&self, other: &BookSnapshot) -> bool {
        OrderBook::has_book_changed(&self.bids, &other.bids, &self.asks, &other.asks)
    }

    /// Whether both sides are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl OrderBook {
    /// Count resident levels on `side` strictly better than `price`.
    ///
    /// Bids are scanned from the highest price down and asks from the lowest
    /// price up; the scan stops at the first level that is not better. A
    /// price better than every level returns the full level count. Side
    /// `None` returns 0.
    ///
    /// # Example
    /// ```
    /// use lob_replay::{Action, MboEvent, OrderBook, Side};
    ///
    /// let mut book = OrderBook::new();
    /// book.process(&MboEvent::new("a", Action::Add, Side::Bid, 10_100, 1));
    /// book.process(&MboEvent::new("b", Action::Add, Side::Bid, 10_000, 1));
    ///
    /// assert_eq!(book.get_depth(Side::Bid, 10_050), 1);
    /// assert_eq!(book.get_depth(Side::Bid, 10_100), 0);
    /// ```
    pub fn get_depth(&self, side: Side, price: i64) -> u32 {
        match (side, self.side_map(side)) {
            (Side::Bid, Some(bids)) => count_ahead(bids.values().rev(), |p| p > price),
            (Side::Ask, Some(asks)) => count_ahead(asks.values(), |p| p < price),
            _ => 0,
        }
    }

    /// Whether either side's snapshot differs element-wise or in length.
    #[inline]
    pub fn has_book_changed(
        old_bids: &[BookLevel],
        new_bids: &[BookLevel],
        old_asks: &[BookLevel],
        new_asks: &[BookLevel],
    ) -> bool {
        old_bids != new_bids || old_asks != new_asks
    }

    /// Whether the current snapshots differ from `prior`.
    #[inline]
    pub fn changed_since(&self, prior: &BookSnapshot) -> bool {
        Self::has_book_changed(&prior.bids, self.get_bids(), &prior.asks, self.get_asks())
    }

    /// Copy both snapshots.
    #[inline]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot::capture(self)
    }
}

/// Count levels (best first) until the first one that is not better.
fn count_ahead<'a>(
    levels: impl Iterator<Item = &'a BookLevel>,
    is_better: impl Fn(i64) -> bool,
) -> u32 {
    let mut depth = 0;
    for level in levels {
        // unreachable while empty levels are deleted eagerly
        if level.size == 0 {
            continue;
        }
        if !is_better(level.price) {
            break;
        }
        depth += 1;
    }
    depth
}
