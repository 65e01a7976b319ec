//! Core data types for MBO events and resting orders.
//!
//! Prices are fixed-point integers scaled by [`PRICE_SCALE`] (four decimal
//! places). Conversion to and from text goes through [`parse_price`] and
//! [`format_price`], which work on the digits directly so no binary floating
//! point is ever involved.

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};

/// Number of fractional digits carried by a fixed-point price.
pub const PRICE_DECIMALS: usize = 4;

/// Fixed-point scale: a decimal price of `1.0` is stored as `10_000`.
pub const PRICE_SCALE: i64 = 10_000;

/// Number of price levels kept in each top-of-book snapshot.
pub const TOP_LEVELS: usize = 10;

/// MBO action type (what happened to the order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    /// Add new order to book
    Add = b'A',
    /// Cancel/remove order
    Cancel = b'C',
    /// Trade against a resting order (full or partial)
    Trade = b'T',
    /// Fill acknowledgment, carries no book-state change
    Fill = b'F',
    /// Clear the whole book (feed resync)
    Reset = b'R',
    /// Anything else
    Unknown = b'U',
}

impl Action {
    /// Parse action from a byte. Unrecognized bytes map to `Unknown`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'A' => Action::Add,
            b'C' => Action::Cancel,
            b'T' => Action::Trade,
            b'F' => Action::Fill,
            b'R' => Action::Reset,
            _ => Action::Unknown,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Bid = b'B',
    /// Sell order (ask)
    Ask = b'A',
    /// Non-directional
    None = b'N',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' => Some(Side::Ask),
            b'N' => Some(Side::None),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// The other side of the book. `None` stays `None`.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
            Side::None => Side::None,
        }
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }
}

/// Feed metadata carried alongside an event.
///
/// Stored verbatim and written back out unchanged; the book never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub ts_recv: String,
    pub ts_event: String,
    pub rtype: String,
    pub publisher_id: String,
    pub instrument_id: String,
    pub channel_id: String,
    pub flags: String,
    pub ts_in_delta: String,
    pub sequence: String,
    pub symbol: String,
}

/// Market By Order (MBO) event.
///
/// One decoded input record. An empty `order_id` means the event does not
/// refer to a specific order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MboEvent {
    /// Order identifier (empty when not applicable)
    pub order_id: String,

    /// Order action (add, cancel, trade, ...)
    pub action: Action,

    /// Order side; for trades this is the aggressor
    pub side: Side,

    /// Price in fixed-point format (divide by `PRICE_SCALE` for decimal)
    pub price: i64,

    /// Size in shares/contracts
    pub size: u32,

    /// Passthrough metadata
    pub meta: EventMeta,
}

impl MboEvent {
    /// Create a new event with empty metadata.
    pub fn new(
        order_id: impl Into<String>,
        action: Action,
        side: Side,
        price: i64,
        size: u32,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            action,
            side,
            price,
            size,
            meta: EventMeta::default(),
        }
    }

    /// A book-clear event.
    pub fn book_reset() -> Self {
        Self::new("", Action::Reset, Side::None, 0, 0)
    }

    /// Attach metadata.
    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.meta.symbol = symbol.into();
        self
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.meta.sequence = sequence.to_string();
        self
    }

    /// Whether the event names an order.
    #[inline]
    pub fn has_order_id(&self) -> bool {
        !self.order_id.is_empty()
    }

    /// Price as a decimal float. Presentation only.
    #[inline]
    pub fn price_as_f64(&self) -> f64 {
        self.price as f64 / PRICE_SCALE as f64
    }
}

/// Resting order stored in the book, keyed by its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub price: i64,
    /// Remaining (unfilled) size
    pub size: u32,
}

// =============================================================================
// Fixed-point prices
// =============================================================================

/// Parse decimal price text into fixed-point.
///
/// Accepts an optional sign, integer digits and an optional fraction. Digits
/// past the fourth decimal are truncated toward zero. Empty text is `0`.
pub fn parse_price(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    let invalid = || ReplayError::InvalidPrice(text.to_string());

    let (negative, body) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let mut whole: i64 = 0;
    for b in int_part.bytes() {
        whole = whole
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(b - b'0')))
            .ok_or_else(invalid)?;
    }

    let mut frac: i64 = 0;
    let mut place = PRICE_SCALE;
    for b in frac_part.bytes().take(PRICE_DECIMALS) {
        place /= 10;
        frac += i64::from(b - b'0') * place;
    }

    let value = whole
        .checked_mul(PRICE_SCALE)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(invalid)?;

    Ok(if negative { -value } else { value })
}

/// Format a fixed-point price as decimal text with trailing zeros trimmed.
///
/// `10_000` -> `"1"`, `51_250` -> `"5.125"`.
pub fn format_price(price: i64) -> String {
    let sign = if price < 0 { "-" } else { "" };
    let abs = price.unsigned_abs();
    let scale = PRICE_SCALE as u64;
    let whole = abs / scale;
    let frac = abs % scale;

    if frac == 0 {
        return format!("{sign}{whole}");
    }

    let digits = format!("{frac:0width$}", width = PRICE_DECIMALS);
    format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Action and Side tests
    // =========================================================================

    #[test]
    fn test_action_from_byte() {
        assert_eq!(Action::from_byte(b'A'), Action::Add);
        assert_eq!(Action::from_byte(b'C'), Action::Cancel);
        assert_eq!(Action::from_byte(b'T'), Action::Trade);
        assert_eq!(Action::from_byte(b'F'), Action::Fill);
        assert_eq!(Action::from_byte(b'R'), Action::Reset);
        assert_eq!(Action::from_byte(b'M'), Action::Unknown);
        assert_eq!(Action::from_byte(b'X'), Action::Unknown);
    }

    #[test]
    fn test_action_to_byte() {
        assert_eq!(Action::Add.to_byte(), b'A');
        assert_eq!(Action::Reset.to_byte(), b'R');
        assert_eq!(Action::Unknown.to_byte(), b'U');
    }

    #[test]
    fn test_side_checks() {
        assert!(Side::Bid.is_bid());
        assert!(!Side::Ask.is_bid());
        assert!(Side::Ask.is_ask());
        assert!(!Side::None.is_bid());
        assert!(!Side::None.is_ask());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert_eq!(Side::None.opposite(), Side::None);
    }

    #[test]
    fn test_side_from_byte() {
        assert_eq!(Side::from_byte(b'B'), Some(Side::Bid));
        assert_eq!(Side::from_byte(b'A'), Some(Side::Ask));
        assert_eq!(Side::from_byte(b'N'), Some(Side::None));
        assert_eq!(Side::from_byte(b'S'), None);
    }

    // =========================================================================
    // MboEvent tests
    // =========================================================================

    #[test]
    fn test_event_builders() {
        let event = MboEvent::new("o1", Action::Add, Side::Bid, 10_000, 5)
            .with_symbol("CLX5")
            .with_sequence(42);

        assert!(event.has_order_id());
        assert_eq!(event.meta.symbol, "CLX5");
        assert_eq!(event.meta.sequence, "42");
        assert_eq!(event.price_as_f64(), 1.0);
    }

    #[test]
    fn test_book_reset_event() {
        let event = MboEvent::book_reset();
        assert_eq!(event.action, Action::Reset);
        assert_eq!(event.side, Side::None);
        assert!(!event.has_order_id());
    }

    // =========================================================================
    // Fixed-point price tests
    // =========================================================================

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1").unwrap(), 10_000);
        assert_eq!(parse_price("1.0").unwrap(), 10_000);
        assert_eq!(parse_price("5.125").unwrap(), 51_250);
        assert_eq!(parse_price("0.0001").unwrap(), 1);
        assert_eq!(parse_price(".5").unwrap(), 5_000);
        assert_eq!(parse_price("7.").unwrap(), 70_000);
        assert_eq!(parse_price("-2.5").unwrap(), -25_000);
        assert_eq!(parse_price(" 3.25 ").unwrap(), 32_500);
        assert_eq!(parse_price("").unwrap(), 0);
    }

    #[test]
    fn test_parse_price_is_exact() {
        // 1.2345 * 10000 in binary floating point lands just below 12345
        assert_eq!(parse_price("1.2345").unwrap(), 12_345);
        assert_eq!(parse_price("0.29").unwrap(), 2_900);
    }

    #[test]
    fn test_parse_price_truncates_extra_digits() {
        assert_eq!(parse_price("1.23456789").unwrap(), 12_345);
        assert_eq!(parse_price("-1.00009").unwrap(), -10_000);
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert!(parse_price("abc").is_err());
        assert!(parse_price("1.2.3").is_err());
        assert!(parse_price(".").is_err());
        assert!(parse_price("-").is_err());
        assert!(parse_price("1e5").is_err());
        assert!(parse_price("99999999999999999999").is_err());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(10_000), "1");
        assert_eq!(format_price(51_250), "5.125");
        assert_eq!(format_price(1), "0.0001");
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(-25_000), "-2.5");
        assert_eq!(format_price(1_234_500), "123.45");
    }
}
