//! Replay driver: events in, MBP-10 rows out.
//!
//! For each event the driver copies the current top-of-book, applies the
//! event, computes the depth of the event's price on its side, and emits a
//! row when the event was a reset or either snapshot changed.
//!
//! # Example
//!
//! ```
//! use lob_replay::output::Mbp10Writer;
//! use lob_replay::replay::Replayer;
//! use lob_replay::source::VecSource;
//! use lob_replay::{Action, MboEvent, Side};
//!
//! let events = vec![
//!     MboEvent::book_reset(),
//!     MboEvent::new("1", Action::Add, Side::Bid, 10_000, 5),
//!     MboEvent::new("1", Action::Fill, Side::Ask, 10_000, 5),
//! ];
//!
//! let mut replayer = Replayer::new();
//! let mut writer = Mbp10Writer::new(Vec::new());
//! let summary = replayer.run(VecSource::new(events), &mut writer).unwrap();
//!
//! assert_eq!(summary.stats.events, 3);
//! assert_eq!(summary.stats.rows_emitted, 2);
//! ```

use std::io::Write;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};
use crate::lob::{BookConfig, BookLevel, BookStats, OrderBook, Outcome};
use crate::output::Mbp10Writer;
use crate::source::{EventSource, EventStream, SkippedRecord};
use crate::types::{Action, MboEvent};
use crate::warnings::{WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig};

/// Configuration for a replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Book configuration
    pub book: BookConfig,

    /// Emit a row for every reset event, even on an already empty book
    pub emit_on_reset: bool,

    /// Record ignored events in the warning tracker
    pub track_warnings: bool,

    /// Warning tracker configuration
    pub warnings: WarningTrackerConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            book: BookConfig::default(),
            emit_on_reset: true,
            track_warnings: true,
            warnings: WarningTrackerConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Create a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the book configuration.
    pub fn with_book(mut self, book: BookConfig) -> Self {
        self.book = book;
        self
    }

    /// Enable/disable rows for reset events.
    pub fn with_emit_on_reset(mut self, emit: bool) -> Self {
        self.emit_on_reset = emit;
        self
    }

    /// Enable/disable warning tracking.
    pub fn with_warnings(mut self, track: bool) -> Self {
        self.track_warnings = track;
        self
    }

    /// Set the warning tracker configuration.
    pub fn with_warning_config(mut self, config: WarningTrackerConfig) -> Self {
        self.warnings = config;
        self
    }
}

/// A row that is due for the last applied event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    /// Zero-based output row index
    pub row: u64,

    /// Levels strictly better than the event price on the event side
    pub depth: u32,
}

/// Counters for a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Events applied
    pub events: u64,

    /// Rows emitted
    pub rows_emitted: u64,

    /// Events that left the top-of-book unchanged (no row)
    pub suppressed: u64,

    /// Events ignored by the book
    pub ignored: u64,

    /// Reset events
    pub resets: u64,

    /// Malformed input records the source skipped
    pub records_skipped: u64,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    /// Replay counters
    pub stats: ReplayStats,

    /// Final book counters
    pub book: BookStats,

    /// Warning summary
    pub warnings: WarningSummary,

    /// Wall-clock duration of the run in seconds
    pub elapsed_secs: f64,
}

impl ReplaySummary {
    /// Throughput in events per second.
    pub fn events_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.stats.events as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Drives one book over a stream of events.
pub struct Replayer {
    config: ReplayConfig,
    book: OrderBook,
    warnings: WarningTracker,
    stats: ReplayStats,

    /// Top-of-book before the current event (reused buffers)
    prior_bids: Vec<BookLevel>,
    prior_asks: Vec<BookLevel>,
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replayer {
    /// Create a replayer with default configuration.
    pub fn new() -> Self {
        Self::with_config(ReplayConfig::default())
    }

    /// Create a replayer with custom configuration.
    pub fn with_config(config: ReplayConfig) -> Self {
        let levels = config.book.levels;
        Self {
            book: OrderBook::with_config(config.book.clone()),
            warnings: WarningTracker::with_config(config.warnings.clone()),
            stats: ReplayStats::default(),
            prior_bids: Vec::with_capacity(levels),
            prior_asks: Vec::with_capacity(levels),
            config,
        }
    }

    /// Apply one event. Returns the row to emit, if any.
    pub fn apply(&mut self, event: &MboEvent) -> Option<Emission> {
        self.prior_bids.clear();
        self.prior_bids.extend_from_slice(self.book.get_bids());
        self.prior_asks.clear();
        self.prior_asks.extend_from_slice(self.book.get_asks());

        let outcome = self.book.process(event);
        let depth = self.book.get_depth(event.side, event.price);
        self.stats.events += 1;

        match outcome {
            Outcome::Ignored(reason) => {
                self.stats.ignored += 1;
                if self.config.track_warnings {
                    self.warnings.record_event(
                        WarningCategory::from(reason),
                        format!("{:?} ignored: {}", event.action, reason.as_str()),
                        event,
                    );
                }
            }
            Outcome::Cleared => {
                self.stats.resets += 1;
                if self.config.track_warnings {
                    self.warnings
                        .record_event(WarningCategory::BookCleared, "book reset", event);
                }
            }
            Outcome::Applied(_) | Outcome::NoOp => {}
        }

        let is_reset = event.action == Action::Reset;
        let changed = OrderBook::has_book_changed(
            &self.prior_bids,
            self.book.get_bids(),
            &self.prior_asks,
            self.book.get_asks(),
        );

        if (is_reset && self.config.emit_on_reset) || changed {
            let row = self.stats.rows_emitted;
            self.stats.rows_emitted += 1;
            Some(Emission { row, depth })
        } else {
            self.stats.suppressed += 1;
            None
        }
    }

    /// Replay a whole source into `writer`.
    ///
    /// Stops at the first error the source yields. Decoding errors are
    /// recorded as warnings before being returned. Records the source
    /// skipped are counted and recorded as warnings too.
    pub fn run<S, W>(&mut self, source: S, writer: &mut Mbp10Writer<W>) -> Result<ReplaySummary>
    where
        S: EventSource,
        W: Write,
    {
        let start = Instant::now();
        if let Some(path) = &source.metadata().file_path {
            log::info!("Replaying {}", path.display());
        }

        writer.write_header()?;

        let mut events = source.events()?;
        loop {
            let item = events.next();
            for skipped in events.take_skipped() {
                self.note_skipped(skipped);
            }

            let event = match item {
                None => break,
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    if matches!(err, ReplayError::MalformedRecord { .. }) && self.config.track_warnings
                    {
                        self.warnings
                            .record_simple(WarningCategory::MalformedRecord, err.to_string());
                    }
                    return Err(err);
                }
            };

            if let Some(emission) = self.apply(&event) {
                writer.write_row(emission.row, &event, emission.depth, &self.book)?;
            }
        }

        writer.flush()?;

        let summary = self.summary(start.elapsed().as_secs_f64());
        log::info!(
            "Replayed {} events: {} rows, {} ignored, {} resets, {} skipped records ({:.0} events/s)",
            summary.stats.events,
            summary.stats.rows_emitted,
            summary.stats.ignored,
            summary.stats.resets,
            summary.stats.records_skipped,
            summary.events_per_sec()
        );
        Ok(summary)
    }

    fn note_skipped(&mut self, skipped: SkippedRecord) {
        self.stats.records_skipped += 1;
        if self.config.track_warnings {
            self.warnings.record_skipped(skipped.line, skipped.reason);
        }
    }

    fn summary(&self, elapsed_secs: f64) -> ReplaySummary {
        ReplaySummary {
            stats: self.stats.clone(),
            book: self.book.stats().clone(),
            warnings: self.warnings.summary(),
            elapsed_secs,
        }
    }

    /// The book being replayed.
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Warnings recorded so far.
    #[inline]
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    /// Replay counters.
    #[inline]
    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Get a reference to the configuration.
    #[inline]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use crate::types::Side;

    fn quiet() -> Replayer {
        Replayer::with_config(
            ReplayConfig::new()
                .with_book(BookConfig::default().with_logging(false))
                .with_warning_config(WarningTrackerConfig::default().with_logging(false)),
        )
    }

    fn add(id: &str, side: Side, price: i64, size: u32) -> MboEvent {
        MboEvent::new(id, Action::Add, side, price, size)
    }

    #[test]
    fn test_reset_on_empty_book_emits() {
        let mut replayer = quiet();

        assert_eq!(
            replayer.apply(&MboEvent::book_reset()),
            Some(Emission { row: 0, depth: 0 })
        );
        assert_eq!(
            replayer.apply(&MboEvent::book_reset()),
            Some(Emission { row: 1, depth: 0 })
        );
        assert_eq!(replayer.stats().resets, 2);
    }

    #[test]
    fn test_reset_row_can_be_disabled() {
        let mut replayer = Replayer::with_config(quiet().config().clone().with_emit_on_reset(false));

        assert_eq!(replayer.apply(&MboEvent::book_reset()), None);
        assert_eq!(replayer.stats().suppressed, 1);
    }

    #[test]
    fn test_add_emits_with_depth() {
        let mut replayer = quiet();

        assert_eq!(
            replayer.apply(&add("1", Side::Bid, 10_100, 1)),
            Some(Emission { row: 0, depth: 0 })
        );
        assert_eq!(
            replayer.apply(&add("2", Side::Bid, 10_000, 1)),
            Some(Emission { row: 1, depth: 1 })
        );
    }

    #[test]
    fn test_deep_add_is_suppressed() {
        let mut replayer = quiet();
        for i in 0..10 {
            replayer.apply(&add(&format!("b{i}"), Side::Bid, 10_000 - i * 10, 1));
        }

        let outcome = replayer.apply(&add("deep", Side::Bid, 5_000, 1));

        assert_eq!(outcome, None);
        assert_eq!(replayer.book().level_count(Side::Bid), 11);
        assert_eq!(replayer.stats().rows_emitted, 10);
        assert_eq!(replayer.stats().suppressed, 1);
    }

    #[test]
    fn test_ignored_events_are_recorded() {
        let mut replayer = quiet();
        replayer.apply(&add("1", Side::Bid, 10_000, 5));

        assert_eq!(
            replayer.apply(&MboEvent::new("x", Action::Cancel, Side::None, 0, 0)),
            None
        );
        assert_eq!(
            replayer.apply(&MboEvent::new("1", Action::Trade, Side::Bid, 10_000, 1)),
            None
        );

        let warnings = replayer.warnings();
        assert_eq!(warnings.count_by_category(WarningCategory::OrderNotFound), 1);
        assert_eq!(warnings.count_by_category(WarningCategory::SideMismatch), 1);
        assert_eq!(replayer.stats().ignored, 2);
    }

    #[test]
    fn test_warnings_can_be_disabled() {
        let mut replayer = Replayer::with_config(quiet().config().clone().with_warnings(false));
        replayer.apply(&MboEvent::new("x", Action::Cancel, Side::None, 0, 0));
        replayer.apply(&MboEvent::book_reset());

        assert!(replayer.warnings().is_empty());
        assert_eq!(replayer.stats().ignored, 1);
    }

    #[test]
    fn test_fill_emits_nothing() {
        let mut replayer = quiet();
        replayer.apply(&add("1", Side::Ask, 10_100, 5));

        assert_eq!(
            replayer.apply(&MboEvent::new("1", Action::Fill, Side::Bid, 10_100, 5)),
            None
        );
    }

    #[test]
    fn test_run_writes_rows() {
        let events = vec![
            MboEvent::book_reset(),
            add("1", Side::Bid, 10_000, 5),
            add("2", Side::Ask, 10_100, 5),
            MboEvent::new("2", Action::Trade, Side::Bid, 10_100, 2),
            MboEvent::new("2", Action::Fill, Side::Bid, 10_100, 2),
            MboEvent::new("1", Action::Cancel, Side::Bid, 10_000, 5),
        ];

        let mut replayer = quiet();
        let mut writer = Mbp10Writer::new(Vec::new());
        let summary = replayer.run(VecSource::new(events), &mut writer).unwrap();

        assert_eq!(summary.stats.events, 6);
        assert_eq!(summary.stats.rows_emitted, 5);
        assert_eq!(summary.book.active_orders, 1);
        assert_eq!(writer.rows_written(), 5);

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 6);
        assert!(rows[5].starts_with("4,"));
    }

    #[test]
    fn test_run_counts_skipped_records() {
        use crate::source::CsvSource;

        let data = "action,side,price,size,order_id\nA,X,1.0,5,1\nA,B,1.0,5,2\nA,B,bad,5,3\nA,B,1.0,5,4\nA,B,2.0,oops,5\n";
        let mut replayer = quiet();
        let mut writer = Mbp10Writer::new(Vec::new());

        let summary = replayer
            .run(
                CsvSource::from_reader(data.as_bytes()).skip_invalid(true),
                &mut writer,
            )
            .unwrap();

        assert_eq!(summary.stats.events, 2);
        assert_eq!(summary.stats.records_skipped, 3);
        assert_eq!(summary.warnings.by_category.get("MALFORMED_RECORD"), Some(&3));

        let lines: Vec<&str> = replayer
            .warnings()
            .warnings_by_category(WarningCategory::MalformedRecord)
            .iter()
            .map(|w| w.context["line"].as_str())
            .collect();
        assert_eq!(lines, vec!["2", "4", "6"]);
    }

    #[test]
    fn test_run_stops_on_malformed_record() {
        use crate::source::CsvSource;

        let data = "action,side,price,size,order_id\nA,B,1.0,5,1\nA,B,bad,5,2\nA,B,1.0,5,3\n";
        let mut replayer = quiet();
        let mut writer = Mbp10Writer::new(Vec::new());

        let err = replayer
            .run(CsvSource::from_reader(data.as_bytes()), &mut writer)
            .unwrap_err();

        assert!(matches!(err, ReplayError::MalformedRecord { line: 3, .. }));
        assert_eq!(replayer.stats().events, 1);
        assert_eq!(
            replayer
                .warnings()
                .count_by_category(WarningCategory::MalformedRecord),
            1
        );
    }
}
