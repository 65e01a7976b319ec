//! # lob-replay
//!
//! Order-level (MBO) replay into top-10 (MBP-10) limit order book snapshots.
//!
//! This library rebuilds a single instrument's limit order book from a
//! stream of Market-By-Order events (add, cancel, trade, fill, reset) and
//! emits a price-aggregated snapshot of the ten best levels per side every
//! time the visible book changes.
//!
//! ## Features
//!
//! - **Exact prices**: fixed-point `i64` scaled by 10 000, parsed and
//!   formatted on digits (no floating point on the data path)
//! - **Eager level deletion**: a price level never survives with zero size
//! - **Tolerant by default**: inapplicable events leave the book untouched
//!   and are reported as an [`Outcome`]
//! - **Diagnostics**: ignored events collected by a bounded [`WarningTracker`]
//!   with JSON export
//! - **CSV in, CSV out**: Databento MBO CSV input, MBP-10 CSV output
//!
//! ## Quick Start
//!
//! ### Book reconstruction
//!
//! ```rust
//! use lob_replay::{Action, MboEvent, OrderBook, Side};
//!
//! let mut book = OrderBook::new();
//!
//! book.process(&MboEvent::new("1001", Action::Add, Side::Bid, 55_100, 100));
//! book.process(&MboEvent::new("1002", Action::Add, Side::Ask, 55_200, 40));
//! book.process(&MboEvent::new("1002", Action::Trade, Side::Bid, 55_200, 15));
//!
//! assert_eq!(book.get_bids()[0].size, 100);
//! assert_eq!(book.get_asks()[0].size, 25);
//! assert_eq!(book.get_depth(Side::Bid, 55_000), 1);
//! ```
//!
//! ### Replaying a file
//!
//! ```ignore
//! use lob_replay::{CsvSource, Mbp10Writer, Replayer};
//!
//! let source = CsvSource::from_path("data/mbo.csv")?.skip_invalid(true);
//! let mut writer = Mbp10Writer::new(std::fs::File::create("mbp10.csv")?);
//!
//! let mut replayer = Replayer::new();
//! let summary = replayer.run(source, &mut writer)?;
//! println!("{} rows", summary.stats.rows_emitted);
//! replayer.warnings().export_json("warnings.json")?;
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `MboEvent`, `Order`, `Action`, `Side`, price conversion |
//! | [`lob`] | Book state machine: `OrderBook`, `BookLevel`, `BookSnapshot`, depth queries |
//! | [`feed`] | Decoding of MBO CSV records |
//! | [`source`] | Event sources: `EventSource`, `CsvSource`, `VecSource` |
//! | [`output`] | MBP-10 CSV writer |
//! | [`replay`] | Replay driver: `Replayer`, `ReplayConfig`, `ReplaySummary` |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |

pub mod error;
pub mod feed;
pub mod lob;
pub mod output;
pub mod replay;
pub mod source;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{ReplayError, Result};
pub use types::{
    format_price, parse_price, Action, EventMeta, MboEvent, Order, Side, PRICE_SCALE, TOP_LEVELS,
};

// Re-exports - Book
pub use lob::{BookConfig, BookLevel, BookSnapshot, BookStats, IgnoreReason, OrderBook, Outcome};

// Re-exports - Replay pipeline
pub use feed::RawMboRecord;
pub use output::Mbp10Writer;
pub use replay::{Emission, ReplayConfig, ReplayStats, ReplaySummary, Replayer};
pub use source::{CsvSource, EventSource, EventStream, SkippedRecord, SourceMetadata, VecSource};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};
