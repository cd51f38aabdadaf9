//! Snapshot validation - what counts as a malformed entry, and what to do about it.
//!
//! The trailing-stop rule itself performs no validation. The policy decides
//! whether that stays true (`Trust`), whether bad entries are dropped
//! (`Skip`), or whether the whole tick fails before touching state (`Reject`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{InstrumentId, InstrumentTick, Snapshot};

/// How the monitor treats malformed snapshot entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedTickPolicy {
    /// Apply every entry as delivered.
    #[default]
    Trust,
    /// Drop malformed entries; the rest of the tick proceeds.
    Skip,
    /// Fail the whole tick without mutating state.
    Reject,
}

/// Why a single entry is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickDefect {
    #[error("empty identifier")]
    EmptyIdentifier,
    #[error("non-finite price (high={high}, low={low})")]
    NonFinitePrice { high: f64, low: f64 },
    #[error("low {low} above high {high}")]
    InvertedRange { high: f64, low: f64 },
    #[error("identifier appears more than once in the snapshot")]
    Duplicate,
}

/// Errors surfaced by a risk model for one tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("malformed entry #{index} ('{identifier}'): {defect}")]
    Malformed {
        index: usize,
        identifier: InstrumentId,
        defect: TickDefect,
    },
}

/// Check a single entry in isolation. Prices on flat entries are never checked.
pub fn check_entry(tick: &InstrumentTick) -> Result<(), TickDefect> {
    if tick.identifier.is_empty() {
        return Err(TickDefect::EmptyIdentifier);
    }
    if !tick.invested {
        return Ok(());
    }
    if !tick.high.is_finite() || !tick.low.is_finite() {
        return Err(TickDefect::NonFinitePrice {
            high: tick.high,
            low: tick.low,
        });
    }
    if tick.low > tick.high {
        return Err(TickDefect::InvertedRange {
            high: tick.high,
            low: tick.low,
        });
    }
    Ok(())
}

/// Every defect in the snapshot, as `(entry index, defect)` pairs.
///
/// The first occurrence of an identifier is judged on its own merits; later
/// occurrences are reported as `Duplicate`.
pub fn find_defects(snapshot: &Snapshot) -> Vec<(usize, TickDefect)> {
    let mut seen: HashSet<&InstrumentId> = HashSet::with_capacity(snapshot.len());
    let mut defects = Vec::new();

    for (index, tick) in snapshot.entries.iter().enumerate() {
        if !seen.insert(&tick.identifier) {
            defects.push((index, TickDefect::Duplicate));
            continue;
        }
        if let Err(defect) = check_entry(tick) {
            defects.push((index, defect));
        }
    }

    defects
}
