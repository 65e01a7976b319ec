//! Single-instrument order book state machine.
//!
//! Implementation notes:
//! - BTreeMap per side for price-ordered levels (bids read back to front)
//! - ahash HashMap for order lookups by identifier
//! - Levels are deleted the moment they empty, so the top-N rebuild is a
//!   plain bounded scan from the front of each map
//! - Each mutation rebuilds only the touched side's top-N snapshot

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::price_level::BookLevel;
use crate::types::{Action, MboEvent, Order, Side, TOP_LEVELS};

/// Configuration for order book behavior.
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Number of price levels kept in each top-of-book snapshot.
    /// Clamped to `1..=TOP_LEVELS` when the book is built.
    pub levels: usize,

    /// Whether to log ignored events at debug level
    pub log_ignored: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            levels: TOP_LEVELS,
            log_ignored: true,
        }
    }
}

impl BookConfig {
    /// Create a new config with the specified snapshot depth, clamped to
    /// `1..=TOP_LEVELS`.
    pub fn new(levels: usize) -> Self {
        let levels = levels.clamp(1, TOP_LEVELS);
        Self {
            levels,
            ..Default::default()
        }
    }

    /// Enable/disable debug logs for ignored events.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_ignored = log;
        self
    }
}

/// Why an event left the book untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Add or trade without an order identifier
    EmptyOrderId,
    /// Cancel or trade for an order that is not live
    OrderNotFound,
    /// Add or trade with side `None`
    MissingSide,
    /// Add with size 0
    ZeroSize,
    /// Trade whose resting order is not opposite the aggressor
    SideMismatch,
}

impl IgnoreReason {
    /// Short description for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::EmptyOrderId => "empty order id",
            IgnoreReason::OrderNotFound => "order not found",
            IgnoreReason::MissingSide => "missing side",
            IgnoreReason::ZeroSize => "zero size",
            IgnoreReason::SideMismatch => "resting order on aggressor side",
        }
    }
}

/// What `process` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The book changed on this side
    Applied(Side),
    /// The whole book was cleared
    Cleared,
    /// The action carries no book-state change (fill, unknown)
    NoOp,
    /// The event could not be applied; the book is unchanged
    Ignored(IgnoreReason),
}

impl Outcome {
    /// The reason, if the event was ignored.
    #[inline]
    pub fn ignored_reason(&self) -> Option<IgnoreReason> {
        match self {
            Outcome::Ignored(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Whether book state was mutated.
    #[inline]
    pub fn mutated(&self) -> bool {
        matches!(self, Outcome::Applied(_) | Outcome::Cleared)
    }
}

/// Counters for monitoring a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStats {
    /// Total events passed to `process`
    pub events_processed: u64,

    /// Applied adds
    pub adds: u64,

    /// Applied cancels
    pub cancels: u64,

    /// Applied trades
    pub trades: u64,

    /// Fill acknowledgments seen
    pub fills: u64,

    /// Events with an unrecognized action
    pub unknown: u64,

    /// Reset events processed
    pub resets: u64,

    /// Events ignored as inapplicable
    pub ignored: u64,

    /// Number of live orders
    pub active_orders: usize,

    /// Number of resident bid levels
    pub bid_levels: usize,

    /// Number of resident ask levels
    pub ask_levels: usize,
}

/// Order book for one instrument stream.
///
/// Owns every live order, the full per-side price aggregation, and the
/// top-of-book snapshots derived from it. Events are applied one at a time
/// through [`OrderBook::process`]; inapplicable events leave the book as it
/// was.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Configuration
    config: BookConfig,

    /// Bid levels: price -> aggregate (best = last)
    bids: BTreeMap<i64, BookLevel>,

    /// Ask levels: price -> aggregate (best = first)
    asks: BTreeMap<i64, BookLevel>,

    /// Live orders: order_id -> Order
    orders: AHashMap<String, Order>,

    /// Top-N bids, highest first
    top_bids: Vec<BookLevel>,

    /// Top-N asks, lowest first
    top_asks: Vec<BookLevel>,

    /// Statistics
    stats: BookStats,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Create an empty book keeping the top 10 levels per side.
    ///
    /// # Example
    /// ```
    /// use lob_replay::OrderBook;
    ///
    /// let book = OrderBook::new();
    /// assert!(book.get_bids().is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_config(BookConfig::default())
    }

    /// Create an empty book with custom configuration.
    pub fn with_config(mut config: BookConfig) -> Self {
        config.levels = config.levels.clamp(1, TOP_LEVELS);
        let levels = config.levels;
        Self {
            config,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: AHashMap::new(),
            top_bids: Vec::with_capacity(levels),
            top_asks: Vec::with_capacity(levels),
            stats: BookStats::default(),
        }
    }

    /// Get a reference to the current configuration.
    #[inline]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    /// Apply one event.
    ///
    /// Reset clears the book; Add, Cancel and Trade update the order
    /// directory, the touched level and that side's snapshot; Fill and
    /// unknown actions do nothing. Events that cannot be applied (missing
    /// or unknown order id, no side on a trade, ...) are ignored and the
    /// reason is returned.
    pub fn process(&mut self, event: &MboEvent) -> Outcome {
        let outcome = match event.action {
            Action::Reset => {
                self.reset();
                self.stats.resets += 1;
                Outcome::Cleared
            }
            Action::Add => self.add_order(event),
            Action::Cancel => self.cancel_order(&event.order_id),
            Action::Trade => self.trade_order(event),
            Action::Fill => {
                self.stats.fills += 1;
                Outcome::NoOp
            }
            Action::Unknown => {
                self.stats.unknown += 1;
                Outcome::NoOp
            }
        };

        self.stats.events_processed += 1;

        if let Outcome::Ignored(reason) = outcome {
            self.stats.ignored += 1;
            if self.config.log_ignored {
                log::debug!(
                    "Ignored {:?} for order {:?} (event #{}): {}",
                    event.action,
                    event.order_id,
                    self.stats.events_processed,
                    reason.as_str()
                );
            }
        }

        self.refresh_stats();
        outcome
    }

    /// Clear all orders, levels and snapshots.
    pub fn reset(&mut self) {
        self.orders.clear();
        self.bids.clear();
        self.asks.clear();
        self.top_bids.clear();
        self.top_asks.clear();
        self.refresh_stats();
    }

    fn add_order(&mut self, event: &MboEvent) -> Outcome {
        if !event.has_order_id() {
            return Outcome::Ignored(IgnoreReason::EmptyOrderId);
        }
        if event.side == Side::None {
            return Outcome::Ignored(IgnoreReason::MissingSide);
        }
        if event.size == 0 {
            return Outcome::Ignored(IgnoreReason::ZeroSize);
        }

        // A reused id replaces the live order
        if let Some(old) = self.orders.remove(&event.order_id) {
            self.release_from_level(old.side, old.price, old.size);
            if old.side != event.side {
                self.rebuild_top(old.side);
            }
        }

        self.orders.insert(
            event.order_id.clone(),
            Order {
                side: event.side,
                price: event.price,
                size: event.size,
            },
        );

        if let Some(map) = self.side_map_mut(event.side) {
            map.entry(event.price)
                .or_insert_with(|| BookLevel::new(event.price))
                .absorb(event.size);
        }

        self.rebuild_top(event.side);
        self.stats.adds += 1;
        Outcome::Applied(event.side)
    }

    fn cancel_order(&mut self, order_id: &str) -> Outcome {
        if order_id.is_empty() {
            return Outcome::Ignored(IgnoreReason::EmptyOrderId);
        }

        let order = match self.orders.remove(order_id) {
            Some(order) => order,
            None => return Outcome::Ignored(IgnoreReason::OrderNotFound),
        };

        self.release_from_level(order.side, order.price, order.size);
        self.rebuild_top(order.side);
        self.stats.cancels += 1;
        Outcome::Applied(order.side)
    }

    /// The event side is the aggressor; the resting order sits opposite.
    fn trade_order(&mut self, event: &MboEvent) -> Outcome {
        if event.side == Side::None {
            return Outcome::Ignored(IgnoreReason::MissingSide);
        }
        if !event.has_order_id() {
            return Outcome::Ignored(IgnoreReason::EmptyOrderId);
        }

        let resting_side = event.side.opposite();

        let order = match self.orders.get_mut(&event.order_id) {
            Some(order) => order,
            None => return Outcome::Ignored(IgnoreReason::OrderNotFound),
        };
        if order.side != resting_side {
            return Outcome::Ignored(IgnoreReason::SideMismatch);
        }

        let traded = order.size.min(event.size);
        order.size -= traded;
        let exhausted = order.size == 0;
        let price = order.price;

        if exhausted {
            self.orders.remove(&event.order_id);
        }

        if let Some(map) = self.side_map_mut(resting_side) {
            let emptied = match map.get_mut(&price) {
                Some(level) => {
                    level.consume(traded);
                    exhausted && level.retire()
                }
                None => false,
            };
            if emptied {
                map.remove(&price);
            }
        }

        self.rebuild_top(resting_side);
        self.stats.trades += 1;
        Outcome::Applied(resting_side)
    }

    /// Take one order out of its level, deleting the level if it empties.
    fn release_from_level(&mut self, side: Side, price: i64, size: u32) {
        let map = match self.side_map_mut(side) {
            Some(map) => map,
            None => return,
        };

        let emptied = match map.get_mut(&price) {
            Some(level) => level.release(size),
            None => return,
        };

        if emptied {
            map.remove(&price);
        }
    }

    /// Rebuild one side's top-N snapshot from its price map.
    fn rebuild_top(&mut self, side: Side) {
        let depth = self.config.levels;
        match side {
            Side::Bid => {
                self.top_bids.clear();
                self.top_bids.extend(
                    self.bids
                        .values()
                        .rev()
                        .filter(|level| !level.is_empty())
                        .take(depth)
                        .copied(),
                );
            }
            Side::Ask => {
                self.top_asks.clear();
                self.top_asks.extend(
                    self.asks
                        .values()
                        .filter(|level| !level.is_empty())
                        .take(depth)
                        .copied(),
                );
            }
            Side::None => {}
        }
    }

    #[inline]
    fn side_map_mut(&mut self, side: Side) -> Option<&mut BTreeMap<i64, BookLevel>> {
        match side {
            Side::Bid => Some(&mut self.bids),
            Side::Ask => Some(&mut self.asks),
            Side::None => None,
        }
    }

    #[inline]
    pub(crate) fn side_map(&self, side: Side) -> Option<&BTreeMap<i64, BookLevel>> {
        match side {
            Side::Bid => Some(&self.bids),
            Side::Ask => Some(&self.asks),
            Side::None => None,
        }
    }

    #[inline]
    fn refresh_stats(&mut self) {
        self.stats.active_orders = self.orders.len();
        self.stats.bid_levels = self.bids.len();
        self.stats.ask_levels = self.asks.len();
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    /// Top-N bid levels, highest price first.
    #[inline]
    pub fn get_bids(&self) -> &[BookLevel] {
        &self.top_bids
    }

    /// Top-N ask levels, lowest price first.
    #[inline]
    pub fn get_asks(&self) -> &[BookLevel] {
        &self.top_asks
    }

    /// Snapshot for one side. `None` yields an empty slice.
    #[inline]
    pub fn top(&self, side: Side) -> &[BookLevel] {
        match side {
            Side::Bid => &self.top_bids,
            Side::Ask => &self.top_asks,
            Side::None => &[],
        }
    }

    /// Live order directory.
    #[inline]
    pub fn get_orders(&self) -> &AHashMap<String, Order> {
        &self.orders
    }

    /// Look up one live order.
    #[inline]
    pub fn get_order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Every resident level on a side, best first.
    pub fn levels(&self, side: Side) -> Box<dyn Iterator<Item = &BookLevel> + '_> {
        match side {
            Side::Bid => Box::new(self.bids.values().rev()),
            Side::Ask => Box::new(self.asks.values()),
            Side::None => Box::new(std::iter::empty()),
        }
    }

    /// Number of resident levels on a side.
    #[inline]
    pub fn level_count(&self, side: Side) -> usize {
        self.side_map(side).map_or(0, BTreeMap::len)
    }

    /// Highest resident bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resident ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    /// Number of live orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Whether the book holds no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get current statistics.
    #[inline]
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }
}
