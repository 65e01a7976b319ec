//! Decoding of MBO CSV records into [`MboEvent`]s.
//!
//! Input follows the Databento MBO CSV layout:
//!
//! ```text
//! ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,price,size,channel_id,order_id,flags,ts_in_delta,sequence,symbol
//! ```
//!
//! Columns are matched by header name, so order does not matter and missing
//! columns read as empty. Metadata columns are carried through as text.

use serde::Deserialize;

use crate::error::{ReplayError, Result};
use crate::types::{parse_price, Action, EventMeta, MboEvent, Side};

/// One MBO CSV row, all fields as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawMboRecord {
    pub ts_recv: String,
    pub ts_event: String,
    pub rtype: String,
    pub publisher_id: String,
    pub instrument_id: String,
    pub action: String,
    pub side: String,
    pub price: String,
    pub size: String,
    pub channel_id: String,
    pub order_id: String,
    pub flags: String,
    pub ts_in_delta: String,
    pub sequence: String,
    pub symbol: String,
}

impl TryFrom<RawMboRecord> for MboEvent {
    type Error = ReplayError;

    fn try_from(raw: RawMboRecord) -> Result<Self> {
        let action = decode_action(&raw.action);
        let side = decode_side(&raw.side)?;
        let price = parse_price(&raw.price)?;
        let size = decode_size(&raw.size)?;

        Ok(MboEvent {
            order_id: raw.order_id.trim().to_string(),
            action,
            side,
            price,
            size,
            meta: EventMeta {
                ts_recv: raw.ts_recv,
                ts_event: raw.ts_event,
                rtype: raw.rtype,
                publisher_id: raw.publisher_id,
                instrument_id: raw.instrument_id,
                channel_id: raw.channel_id,
                flags: raw.flags,
                ts_in_delta: raw.ts_in_delta,
                sequence: raw.sequence,
                symbol: raw.symbol,
            },
        })
    }
}

/// Empty text is `Unknown`; otherwise the first byte decides.
pub fn decode_action(text: &str) -> Action {
    text.trim()
        .bytes()
        .next()
        .map_or(Action::Unknown, Action::from_byte)
}

/// Empty text is `None`; `B`, `A` and `N` map to sides.
pub fn decode_side(text: &str) -> Result<Side> {
    let trimmed = text.trim();
    match trimmed.as_bytes() {
        [] => Ok(Side::None),
        [byte] => Side::from_byte(*byte).ok_or_else(|| ReplayError::InvalidSide(text.to_string())),
        _ => Err(ReplayError::InvalidSide(text.to_string())),
    }
}

/// Empty text is `0`; otherwise an unsigned integer.
pub fn decode_size(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ReplayError::InvalidSize(text.to_string()))
}
