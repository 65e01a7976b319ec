//! Event source abstraction for replay input.
//!
//! A source turns some storage (memory, a CSV file, any reader) into a
//! stream of decoded [`MboEvent`]s so the replay driver does not care where
//! events come from.
//!
//! # Example
//!
//! ```
//! use lob_replay::source::{CsvSource, EventSource};
//!
//! let data = "action,side,price,size,order_id\nA,B,1.0,5,o1\nC,B,1.0,5,o1\n";
//! let source = CsvSource::from_reader(data.as_bytes());
//!
//! let events: Vec<_> = source.events().unwrap().collect::<Result<_, _>>().unwrap();
//! assert_eq!(events.len(), 2);
//! ```
//!
//! # Implementing Custom Sources
//!
//! ```ignore
//! struct MySource { events: Vec<MboEvent>, metadata: SourceMetadata }
//!
//! impl EventSource for MySource {
//!     type EventIter = std::iter::Map<std::vec::IntoIter<MboEvent>, fn(MboEvent) -> Result<MboEvent>>;
//!
//!     fn events(self) -> Result<Self::EventIter> {
//!         Ok(self.events.into_iter().map(Ok as fn(MboEvent) -> Result<MboEvent>))
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ReplayError, Result};
use crate::feed::RawMboRecord;
use crate::types::MboEvent;

/// I/O buffer size for file-backed sources.
pub const IO_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an event source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Trading symbol (e.g., "CLX5")
    pub symbol: Option<String>,

    /// Trading date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "csv", "memory")
    pub provider: Option<String>,

    /// Estimated event count (for progress tracking)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Extract metadata from a file path.
    ///
    /// - `CLX5_2025-07-17.mbo.csv` -> symbol="CLX5", date="2025-07-17"
    /// - `CLX5.mbo.csv` -> symbol="CLX5"
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            let base = filename
                .trim_end_matches(".csv")
                .trim_end_matches(".mbo");

            if let Some((symbol, rest)) = base.split_once('_') {
                metadata.symbol = Some(symbol.to_string());
                metadata.date = rest
                    .get(..10)
                    .filter(|date| date.as_bytes().get(4) == Some(&b'-'))
                    .map(str::to_string);
            } else if !base.is_empty() {
                metadata.symbol = Some(base.to_string());
            }
        }

        metadata
    }
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// A record the source dropped instead of yielding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Line of the record in the input (1-based, header included)
    pub line: u64,
    /// Why the record could not be decoded
    pub reason: String,
}

/// Iterator over a source's events.
///
/// Sources that drop malformed records queue them; consumers drain the queue
/// with [`EventStream::take_skipped`] to account for them.
pub trait EventStream: Iterator<Item = Result<MboEvent>> {
    /// Records skipped since the last call.
    fn take_skipped(&mut self) -> Vec<SkippedRecord> {
        Vec::new()
    }
}

/// Trait for event sources.
///
/// - `events()` consumes `self` to allow single-pass iteration
/// - the iterator yields `Err` for records that could not be decoded; what
///   happens after that is up to the source (see [`CsvSource::skip_invalid`])
pub trait EventSource {
    /// The iterator type for events.
    type EventIter: EventStream;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source.
///
/// # Example
///
/// ```
/// use lob_replay::source::{EventSource, SourceMetadata, VecSource};
/// use lob_replay::{Action, MboEvent, Side};
///
/// let events = vec![
///     MboEvent::new("1", Action::Add, Side::Bid, 10_000, 100),
///     MboEvent::new("2", Action::Add, Side::Ask, 10_100, 100),
/// ];
///
/// let source = VecSource::new(events)
///     .with_metadata(SourceMetadata::new().with_symbol("TEST"));
///
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
pub struct VecSource {
    events: Vec<MboEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(events: Vec<MboEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl EventStream for std::iter::Map<std::vec::IntoIter<MboEvent>, fn(MboEvent) -> Result<MboEvent>> {}

impl EventSource for VecSource {
    type EventIter = std::iter::Map<std::vec::IntoIter<MboEvent>, fn(MboEvent) -> Result<MboEvent>>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self
            .events
            .into_iter()
            .map(Ok as fn(MboEvent) -> Result<MboEvent>))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// CSV Source
// ============================================================================

/// Counters kept while reading a CSV source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Records decoded into events
    pub records_read: u64,
    /// Malformed records skipped
    pub records_skipped: u64,
}

/// Event source reading MBO CSV (see [`crate::feed`]) from any reader.
pub struct CsvSource<R: Read> {
    reader: R,
    metadata: SourceMetadata,
    skip_invalid: bool,
}

impl CsvSource<BufReader<File>> {
    /// Open a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ReplayError::generic(format!("Failed to open {}: {e}", path.display()))
        })?;

        let metadata = SourceMetadata::from_path(path).with_provider("csv");
        log::info!(
            "Opened {} ({} bytes)",
            path.display(),
            metadata.file_size.unwrap_or(0)
        );

        Ok(Self {
            reader: BufReader::with_capacity(IO_BUFFER_SIZE, file),
            metadata,
            skip_invalid: false,
        })
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap an already open reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            metadata: SourceMetadata::new().with_provider("csv"),
            skip_invalid: false,
        }
    }

    /// Skip records that fail to decode instead of stopping.
    ///
    /// Skipped records are logged, counted and queued for
    /// [`EventStream::take_skipped`]. I/O failures always stop the stream.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl<R: Read> EventSource for CsvSource<R> {
    type EventIter = CsvEventIter<R>;

    fn events(self) -> Result<Self::EventIter> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(self.reader);
        let headers = reader.headers()?.clone();

        Ok(CsvEventIter {
            reader,
            headers,
            record: csv::StringRecord::new(),
            skip_invalid: self.skip_invalid,
            stats: SourceStats::default(),
            skipped: Vec::new(),
            finished: false,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator over events decoded from CSV records.
pub struct CsvEventIter<R: Read> {
    reader: csv::Reader<R>,
    headers: csv::StringRecord,
    record: csv::StringRecord,
    skip_invalid: bool,
    stats: SourceStats,
    skipped: Vec<SkippedRecord>,
    finished: bool,
}

impl<R: Read> CsvEventIter<R> {
    /// Get current statistics.
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Read and decode the next record. `Ok(None)` at end of input.
    fn read_next(&mut self) -> std::result::Result<Option<MboEvent>, (u64, ReplayError)> {
        let line = self.reader.position().line();
        let more = self
            .reader
            .read_record(&mut self.record)
            .map_err(|e| (line, ReplayError::from(e)))?;
        if !more {
            return Ok(None);
        }

        let line = self.record.position().map_or(line, |p| p.line());
        self.record
            .deserialize::<RawMboRecord>(Some(&self.headers))
            .map_err(ReplayError::from)
            .and_then(MboEvent::try_from)
            .map(Some)
            .map_err(|e| (line, e))
    }
}

impl<R: Read> Iterator for CsvEventIter<R> {
    type Item = Result<MboEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            let (line, err) = match self.read_next() {
                Ok(Some(event)) => {
                    self.stats.records_read += 1;
                    return Some(Ok(event));
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(failure) => failure,
            };

            let skippable = match &err {
                ReplayError::Csv(e) => !e.is_io_error(),
                other => other.is_record_error(),
            };

            if skippable && self.skip_invalid {
                log::warn!("Skipping malformed record at line {line}: {err}");
                self.stats.records_skipped += 1;
                self.skipped.push(SkippedRecord {
                    line,
                    reason: err.to_string(),
                });
                continue;
            }

            self.finished = true;
            if skippable {
                log::error!("Malformed record at line {line}: {err}");
                return Some(Err(ReplayError::MalformedRecord {
                    line,
                    reason: err.to_string(),
                }));
            }
            log::error!("Failed to read input: {err}");
            return Some(Err(err));
        }
    }
}

impl<R: Read> EventStream for CsvEventIter<R> {
    fn take_skipped(&mut self) -> Vec<SkippedRecord> {
        std::mem::take(&mut self.skipped)
    }
}
