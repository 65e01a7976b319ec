//! Limit order book reconstruction module.
//!
//! The book state machine, its price level aggregate, and the read-only
//! depth/change queries built on top of it.

pub mod book;
mod price_level;
mod query;

pub use book::{BookConfig, BookStats, IgnoreReason, OrderBook, Outcome};
pub use price_level::BookLevel;
pub use query::BookSnapshot;
