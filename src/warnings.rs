//! Warning tracking for replay diagnostics.
//!
//! The book ignores events it cannot apply and keeps going. This module keeps
//! a record of what was ignored (and why) so a replay can be audited after
//! the fact without slowing the hot path or aborting the run.
//!
//! # Example
//!
//! ```
//! use lob_replay::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_simple(WarningCategory::OrderNotFound, "cancel for unknown order 42");
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! assert_eq!(summary.by_category.get("ORDER_NOT_FOUND"), Some(&1));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::lob::IgnoreReason;
use crate::types::MboEvent;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Add, cancel or trade without an order identifier
    EmptyOrderId,

    /// Cancel or trade for an order that is not live
    OrderNotFound,

    /// Add or trade with no side
    MissingSide,

    /// Add with size 0
    ZeroSize,

    /// Trade whose resting order sits on the aggressor's side
    SideMismatch,

    /// Input record that could not be decoded
    MalformedRecord,

    /// Book was cleared by a reset event
    BookCleared,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::EmptyOrderId => "EMPTY_ORDER_ID",
            WarningCategory::OrderNotFound => "ORDER_NOT_FOUND",
            WarningCategory::MissingSide => "MISSING_SIDE",
            WarningCategory::ZeroSize => "ZERO_SIZE",
            WarningCategory::SideMismatch => "SIDE_MISMATCH",
            WarningCategory::MalformedRecord => "MALFORMED_RECORD",
            WarningCategory::BookCleared => "BOOK_CLEARED",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::EmptyOrderId => 2,
            WarningCategory::OrderNotFound => 1,
            WarningCategory::MissingSide => 2,
            WarningCategory::ZeroSize => 1,
            WarningCategory::SideMismatch => 3,
            WarningCategory::MalformedRecord => 3,
            WarningCategory::BookCleared => 1,
        }
    }
}

impl From<IgnoreReason> for WarningCategory {
    fn from(reason: IgnoreReason) -> Self {
        match reason {
            IgnoreReason::EmptyOrderId => WarningCategory::EmptyOrderId,
            IgnoreReason::OrderNotFound => WarningCategory::OrderNotFound,
            IgnoreReason::MissingSide => WarningCategory::MissingSide,
            IgnoreReason::ZeroSize => WarningCategory::ZeroSize,
            IgnoreReason::SideMismatch => WarningCategory::SideMismatch,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented)
    pub id: u64,

    /// Warning category
    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// Event timestamp as it appeared in the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_event: Option<String>,

    /// Related order ID (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    /// Related price (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,

    /// Related size (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Input sequence number (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,

    /// Additional context as key-value pairs
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub context: HashMap<String, String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            ts_event: None,
            order_id: None,
            price: None,
            size: None,
            sequence: None,
            context: HashMap::new(),
        }
    }

    /// Copy identifying fields from the event that caused the warning.
    pub fn for_event(mut self, event: &MboEvent) -> Self {
        if event.has_order_id() {
            self.order_id = Some(event.order_id.clone());
        }
        if !event.meta.ts_event.is_empty() {
            self.ts_event = Some(event.meta.ts_event.clone());
        }
        if !event.meta.sequence.is_empty() {
            self.sequence = Some(event.meta.sequence.clone());
        }
        self.price = Some(event.price);
        self.size = Some(event.size);
        self
    }

    /// Set the order ID.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Add context key-value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings, including those not stored
    pub total: u64,

    /// Warnings kept in memory
    pub stored: u64,

    /// Count by category name
    pub by_category: BTreeMap<String, u64>,

    /// Count by severity
    pub by_severity: BTreeMap<u8, u64>,

    /// Number of distinct order IDs among stored warnings
    pub unique_orders: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to emit each warning through the `log` facade
    pub log_warnings: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_warnings: true,
            min_log_severity: 2,
        }
    }
}

impl WarningTrackerConfig {
    /// Keep at most `max` warnings in memory.
    pub fn with_max_warnings(mut self, max: usize) -> Self {
        self.max_warnings = max;
        self
    }

    /// Enable/disable logging of individual warnings.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }
}

/// On-disk shape of an exported report.
#[derive(Serialize)]
struct WarningReport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Collects warnings raised during a replay.
///
/// Storage is bounded by `max_warnings`; counts keep growing past the bound
/// so the summary stays exact.
#[derive(Debug)]
pub struct WarningTracker {
    /// Configuration
    config: WarningTrackerConfig,

    /// Stored warnings
    warnings: Vec<Warning>,

    /// Counter for unique IDs
    next_id: u64,

    /// Count by category (for fast summary)
    category_counts: HashMap<WarningCategory, u64>,

    /// Order IDs seen in stored warnings
    unique_orders: HashSet<String>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: HashMap::new(),
            unique_orders: HashSet::new(),
        }
    }

    /// Next warning ID.
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record a warning. Returns its ID.
    pub fn record(&mut self, warning: Warning) -> u64 {
        if self.config.log_warnings && warning.category.severity() >= self.config.min_log_severity
        {
            log::warn!(
                "[{}] #{}: {}",
                warning.category.name(),
                warning.id,
                warning.message
            );
        }

        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        let id = warning.id;
        if self.warnings.len() < self.config.max_warnings {
            if let Some(order_id) = &warning.order_id {
                self.unique_orders.insert(order_id.clone());
            }
            self.warnings.push(warning);
        }
        id
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(&mut self, category: WarningCategory, message: impl Into<String>) -> u64 {
        let id = self.allocate_id();
        self.record(Warning::new(id, category, message))
    }

    /// Record an input record the source skipped as malformed.
    pub fn record_skipped(&mut self, line: u64, reason: impl Into<String>) -> u64 {
        let id = self.allocate_id();
        let reason = reason.into();
        self.record(
            Warning::new(
                id,
                WarningCategory::MalformedRecord,
                format!("skipped record: {reason}"),
            )
            .with_context("line", line.to_string()),
        )
    }

    /// Record a warning tied to an input event.
    pub fn record_event(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        event: &MboEvent,
    ) -> u64 {
        let id = self.allocate_id();
        self.record(Warning::new(id, category, message).for_event(event))
    }

    /// Get the number of warnings stored.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been stored.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count including warnings past the storage bound.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all stored warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get stored warnings of one category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = BTreeMap::new();
        let mut by_severity = BTreeMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            stored: self.warnings.len() as u64,
            by_category,
            by_severity,
            unique_orders: self.unique_orders.len() as u64,
        }
    }

    /// Write the summary and stored warnings to `writer` as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let report = WarningReport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(writer, &report)?;
        Ok(())
    }

    /// Export the summary and stored warnings to a JSON file.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings and counts.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.unique_orders.clear();
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
