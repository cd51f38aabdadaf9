//! Position feeds - the upstream source of tick snapshots.
//!
//! - [`VecFeed`] - in-memory, for tests and embedding
//! - [`CsvTickFeed`] - recorded ticks, one row per instrument per tick

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{InstrumentId, InstrumentTick, Snapshot};

/// Errors from a position feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invested entry for '{symbol}' is missing {field}")]
    MissingPrice {
        row: u64,
        symbol: String,
        field: &'static str,
    },
    #[error("row {row}: time {found} is earlier than previous snapshot at {previous}")]
    OutOfOrder {
        row: u64,
        previous: NaiveDateTime,
        found: NaiveDateTime,
    },
}

/// Upstream source of snapshots, consumed one tick at a time.
pub trait PositionFeed {
    /// The next snapshot, or `None` once the feed is exhausted.
    fn next_snapshot(&mut self) -> Result<Option<Snapshot>, FeedError>;
}

/// Feed over snapshots held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecFeed {
    snapshots: VecDeque<Snapshot>,
}

impl VecFeed {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            snapshots: snapshots.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.snapshots.len()
    }
}

impl PositionFeed for VecFeed {
    fn next_snapshot(&mut self) -> Result<Option<Snapshot>, FeedError> {
        Ok(self.snapshots.pop_front())
    }
}

/// One CSV row: `time,symbol,invested,high,low`.
///
/// Prices may be left empty on flat rows.
#[derive(Debug, Clone, Deserialize)]
struct TickRow {
    time: NaiveDateTime,
    symbol: String,
    invested: bool,
    high: Option<f64>,
    low: Option<f64>,
}

/// Feed reading recorded ticks from CSV.
///
/// Consecutive rows sharing a `time` form one snapshot. A snapshot whose
/// time is earlier than the previous one is `FeedError::OutOfOrder`.
pub struct CsvTickFeed<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, TickRow>,
    pending: Option<(u64, TickRow)>,
    row: u64,
    last_time: Option<NaiveDateTime>,
}

impl CsvTickFeed<File> {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Ok(Self::from_csv(reader))
    }
}

impl<R: Read> CsvTickFeed<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv(reader: csv::Reader<R>) -> Self {
        Self {
            rows: reader.into_deserialize(),
            pending: None,
            row: 0,
            last_time: None,
        }
    }

    fn next_row(&mut self) -> Result<Option<(u64, TickRow)>, FeedError> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        match self.rows.next() {
            Some(record) => {
                self.row += 1;
                Ok(Some((self.row, record?)))
            }
            None => Ok(None),
        }
    }
}

fn to_tick(row_number: u64, row: TickRow) -> Result<InstrumentTick, FeedError> {
    if !row.invested {
        return Ok(InstrumentTick::flat(InstrumentId::new(row.symbol)));
    }
    let high = row.high.ok_or_else(|| FeedError::MissingPrice {
        row: row_number,
        symbol: row.symbol.clone(),
        field: "high",
    })?;
    let low = row.low.ok_or_else(|| FeedError::MissingPrice {
        row: row_number,
        symbol: row.symbol.clone(),
        field: "low",
    })?;
    Ok(InstrumentTick::invested(InstrumentId::new(row.symbol), high, low))
}

impl<R: Read> PositionFeed for CsvTickFeed<R> {
    fn next_snapshot(&mut self) -> Result<Option<Snapshot>, FeedError> {
        let Some((row_number, first)) = self.next_row()? else {
            return Ok(None);
        };

        let time = first.time;
        if let Some(previous) = self.last_time {
            if time < previous {
                return Err(FeedError::OutOfOrder {
                    row: row_number,
                    previous,
                    found: time,
                });
            }
        }
        self.last_time = Some(time);
        let mut entries = vec![to_tick(row_number, first)?];

        while let Some((row_number, row)) = self.next_row()? {
            if row.time != time {
                self.pending = Some((row_number, row));
                break;
            }
            entries.push(to_tick(row_number, row)?);
        }

        Ok(Some(Snapshot::new(time, entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
time,symbol,invested,high,low
2024-01-02T09:30:00,SPY,true,100.0,98.0
2024-01-02T09:30:00,QQQ,false,,
2024-01-02T09:31:00,SPY,true,100.0,94.0
";

    #[test]
    fn groups_rows_by_time() {
        let mut feed = CsvTickFeed::from_reader(SAMPLE.as_bytes());

        let first = feed.next_snapshot().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.entries[0], InstrumentTick::invested("SPY", 100.0, 98.0));
        assert!(!first.entries[1].invested);
        assert_eq!(first.entries[1].identifier.as_str(), "QQQ");

        let second = feed.next_snapshot().unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.entries[0].low, 94.0);
        assert!(second.time > first.time);

        assert!(feed.next_snapshot().unwrap().is_none());
    }

    #[test]
    fn invested_row_without_low_is_error() {
        let csv_text = "time,symbol,invested,high,low\n2024-01-02T09:30:00,SPY,true,100.0,\n";
        let mut feed = CsvTickFeed::from_reader(csv_text.as_bytes());
        let err = feed.next_snapshot().unwrap_err();
        assert!(matches!(
            err,
            FeedError::MissingPrice { row: 1, field: "low", .. }
        ));
    }

    #[test]
    fn earlier_time_is_out_of_order() {
        let csv_text = "\
time,symbol,invested,high,low
2024-01-02T09:31:00,SPY,true,100.0,99.0
2024-01-02T09:31:00,QQQ,true,300.0,299.0
2024-01-02T09:30:00,SPY,true,100.0,90.0
";
        let mut feed = CsvTickFeed::from_reader(csv_text.as_bytes());
        assert_eq!(feed.next_snapshot().unwrap().unwrap().len(), 2);
        let err = feed.next_snapshot().unwrap_err();
        match err {
            FeedError::OutOfOrder {
                row,
                previous,
                found,
            } => {
                assert_eq!(row, 3);
                assert!(found < previous);
            }
            other => panic!("expected OutOfOrder, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_row_is_csv_error() {
        let csv_text = "time,symbol,invested,high,low\nyesterday,SPY,true,100.0,99.0\n";
        let mut feed = CsvTickFeed::from_reader(csv_text.as_bytes());
        assert!(matches!(feed.next_snapshot(), Err(FeedError::Csv(_))));
    }

    #[test]
    fn vec_feed_drains_in_order() {
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let t1 = t0 + chrono::Duration::minutes(1);
        let mut feed = VecFeed::new(vec![Snapshot::new(t0, vec![]), Snapshot::new(t1, vec![])]);
        assert_eq!(feed.remaining(), 2);
        assert_eq!(feed.next_snapshot().unwrap().unwrap().time, t0);
        assert_eq!(feed.next_snapshot().unwrap().unwrap().time, t1);
        assert!(feed.next_snapshot().unwrap().is_none());
    }
}
