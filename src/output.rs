//! MBP-10 CSV output.
//!
//! One row per emitted snapshot: the triggering event's fields, the depth of
//! its price, then ten interleaved bid/ask level triples.
//!
//! ```text
//! ,ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,depth,price,size,flags,ts_in_delta,sequence,
//! bid_px_00,bid_sz_00,bid_ct_00,ask_px_00,ask_sz_00,ask_ct_00,...,bid_px_09,...,ask_ct_09,symbol,order_id
//! ```
//!
//! Absent levels are written as an empty price with size and count `0`.

use std::io::Write;

use crate::error::Result;
use crate::lob::{BookLevel, OrderBook};
use crate::types::{format_price, MboEvent, TOP_LEVELS};

/// Record type written in the `rtype` column (MBP-10).
pub const MBP10_RTYPE: &str = "10";

/// Leading columns before the level block.
const EVENT_COLUMNS: [&str; 14] = [
    "",
    "ts_recv",
    "ts_event",
    "rtype",
    "publisher_id",
    "instrument_id",
    "action",
    "side",
    "depth",
    "price",
    "size",
    "flags",
    "ts_in_delta",
    "sequence",
];

/// Writes MBP-10 rows to any `Write` sink.
///
/// The header is written lazily before the first row, or explicitly through
/// [`Mbp10Writer::write_header`].
///
/// # Example
///
/// ```
/// use lob_replay::output::Mbp10Writer;
/// use lob_replay::{Action, MboEvent, OrderBook, Side};
///
/// let mut book = OrderBook::new();
/// let event = MboEvent::new("1", Action::Add, Side::Bid, 55_100, 100);
/// book.process(&event);
///
/// let mut writer = Mbp10Writer::new(Vec::new());
/// writer.write_row(0, &event, 0, &book).unwrap();
/// let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
///
/// assert!(text.lines().nth(1).unwrap().contains(",5.51,100,1,,0,0,"));
/// ```
pub struct Mbp10Writer<W: Write> {
    writer: csv::Writer<W>,
    record: csv::StringRecord,
    header_written: bool,
    rows_written: u64,
}

impl<W: Write> Mbp10Writer<W> {
    /// Wrap a sink.
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_writer(sink);

        Self {
            writer,
            record: csv::StringRecord::with_capacity(512, header_len()),
            header_written: false,
            rows_written: 0,
        }
    }

    /// Write the header row. Does nothing if it was already written.
    pub fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }

        self.record.clear();
        for column in EVENT_COLUMNS {
            self.record.push_field(column);
        }
        for i in 0..TOP_LEVELS {
            for prefix in ["bid_px", "bid_sz", "bid_ct", "ask_px", "ask_sz", "ask_ct"] {
                self.record.push_field(&format!("{prefix}_{i:02}"));
            }
        }
        self.record.push_field("symbol");
        self.record.push_field("order_id");

        self.writer.write_record(&self.record)?;
        self.header_written = true;
        Ok(())
    }

    /// Write one row for `event` with the book's current snapshots.
    pub fn write_row(
        &mut self,
        row: u64,
        event: &MboEvent,
        depth: u32,
        book: &OrderBook,
    ) -> Result<()> {
        self.write_header()?;

        let meta = &event.meta;
        let record = &mut self.record;
        record.clear();

        record.push_field(&row.to_string());
        record.push_field(&meta.ts_recv);
        record.push_field(&meta.ts_event);
        record.push_field(MBP10_RTYPE);
        record.push_field(&meta.publisher_id);
        record.push_field(&meta.instrument_id);
        record.push_field(char::from(event.action.to_byte()).encode_utf8(&mut [0; 4]));
        record.push_field(char::from(event.side.to_byte()).encode_utf8(&mut [0; 4]));
        record.push_field(&depth.to_string());
        record.push_field(&format_price(event.price));
        record.push_field(&event.size.to_string());
        record.push_field(&meta.flags);
        record.push_field(&meta.ts_in_delta);
        record.push_field(&meta.sequence);

        let bids = book.get_bids();
        let asks = book.get_asks();
        for i in 0..TOP_LEVELS {
            push_level(record, bids.get(i));
            push_level(record, asks.get(i));
        }

        record.push_field(&meta.symbol);
        record.push_field(&event.order_id);

        self.writer.write_record(&self.record)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows written so far (header excluded).
    #[inline]
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush buffered rows to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::ReplayError::Io(e.into_error()))
    }
}

fn header_len() -> usize {
    EVENT_COLUMNS.len() + TOP_LEVELS * 6 + 2
}

fn push_level(record: &mut csv::StringRecord, level: Option<&BookLevel>) {
    match level {
        Some(level) => {
            record.push_field(&format_price(level.price));
            record.push_field(&level.size.to_string());
            record.push_field(&level.count.to_string());
        }
        None => {
            record.push_field("");
            record.push_field("0");
            record.push_field("0");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, EventMeta, Side};

    fn render(rows: &[(u64, MboEvent, u32)], book: &OrderBook) -> String {
        let mut writer = Mbp10Writer::new(Vec::new());
        writer.write_header().unwrap();
        for (row, event, depth) in rows {
            writer.write_row(*row, event, *depth, book).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let text = render(&[], &OrderBook::new());
        let header = text.trim_end();
        let columns: Vec<&str> = header.split(',').collect();

        assert!(header.starts_with(",ts_recv,ts_event,rtype,publisher_id"));
        assert_eq!(columns.len(), header_len());
        assert_eq!(columns[14], "bid_px_00");
        assert_eq!(columns[19], "ask_ct_00");
        assert_eq!(columns[20], "bid_px_01");
        assert_eq!(columns[columns.len() - 3], "ask_ct_09");
        assert!(header.ends_with("ask_ct_09,symbol,order_id"));
    }

    #[test]
    fn test_header_written_once() {
        let mut writer = Mbp10Writer::new(Vec::new());
        writer.write_header().unwrap();
        writer.write_header().unwrap();
        writer
            .write_row(0, &MboEvent::book_reset(), 0, &OrderBook::new())
            .unwrap();

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_reset_row_on_empty_book() {
        let event = MboEvent::book_reset().with_meta(EventMeta {
            ts_recv: "2025-07-17T07:05:09.035793433Z".into(),
            ts_event: "2025-07-17T07:05:09.035627674Z".into(),
            rtype: "160".into(),
            publisher_id: "2".into(),
            instrument_id: "1108".into(),
            flags: "8".into(),
            ts_in_delta: "166417".into(),
            sequence: "0".into(),
            symbol: "ARL".into(),
            ..EventMeta::default()
        });

        let text = render(&[(0, event, 0)], &OrderBook::new());
        let row = text.lines().nth(1).unwrap();

        let mut expected = String::from(
            "0,2025-07-17T07:05:09.035793433Z,2025-07-17T07:05:09.035627674Z,10,2,1108,R,N,0,0,0,8,166417,0",
        );
        for _ in 0..TOP_LEVELS * 2 {
            expected.push_str(",,0,0");
        }
        expected.push_str(",ARL,");
        assert_eq!(row, expected);
    }

    #[test]
    fn test_row_with_levels() {
        let mut book = OrderBook::new();
        book.process(&MboEvent::new("1", Action::Add, Side::Bid, 55_100, 100));
        book.process(&MboEvent::new("2", Action::Add, Side::Bid, 55_000, 40));
        book.process(&MboEvent::new("3", Action::Add, Side::Bid, 55_000, 60));
        let event = MboEvent::new("4", Action::Add, Side::Ask, 212_500, 7);
        book.process(&event);

        let text = render(&[(3, event, 0)], &book);
        let row = text.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();

        assert_eq!(fields.len(), header_len());
        assert_eq!(&fields[..1], &["3"]);
        assert_eq!(&fields[6..11], &["A", "A", "0", "21.25", "7"]);
        assert_eq!(&fields[14..20], &["5.51", "100", "1", "21.25", "7", "1"]);
        assert_eq!(&fields[20..26], &["5.5", "100", "2", "", "0", "0"]);
        assert_eq!(fields[fields.len() - 1], "4");
    }
}
