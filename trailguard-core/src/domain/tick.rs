//! Tick data - one evaluation step's view of every instrument the feed knows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::InstrumentId;

/// Per-instrument data for a single tick.
///
/// `high` and `low` are the tick's price range. `low <= high` is part of the
/// feed contract; it is only checked when a validating policy is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentTick {
    pub identifier: InstrumentId,
    pub invested: bool,
    pub high: f64,
    pub low: f64,
}

impl InstrumentTick {
    pub fn invested(identifier: impl Into<InstrumentId>, high: f64, low: f64) -> Self {
        Self {
            identifier: identifier.into(),
            invested: true,
            high,
            low,
        }
    }

    /// A flat entry. Prices are irrelevant for flat instruments and set to NaN.
    pub fn flat(identifier: impl Into<InstrumentId>) -> Self {
        Self {
            identifier: identifier.into(),
            invested: false,
            high: f64::NAN,
            low: f64::NAN,
        }
    }
}

/// All instrument ticks delivered for one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: NaiveDateTime,
    pub entries: Vec<InstrumentTick>,
}

impl Snapshot {
    pub fn new(time: NaiveDateTime, entries: Vec<InstrumentTick>) -> Self {
        Self { time, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
