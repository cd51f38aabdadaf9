//! Trailing-high drawdown monitor.
//!
//! For each invested instrument the monitor remembers the highest tick-high
//! seen since the instrument became invested. On a tick where that high does
//! not advance, the tick-low is compared against
//! `trailing_high * (1 - maximum_drawdown_fraction)`; falling strictly below
//! it emits a liquidation instruction.
//!
//! ## Per-entry rule
//!
//! 1. Flat: evict the record (no-op if absent). Nothing emitted.
//! 2. Invested, no record or `high > record`: store `high`. Nothing emitted,
//!    a fresh or rising high suppresses the check for this tick.
//! 3. Invested, `high <= record`: emit if `low < record * (1 - f)`. The
//!    record is left as is.
//!
//! Emitting an instruction never changes state. While the feed keeps
//! reporting the instrument invested and the condition holds, the same
//! instruction is emitted again every tick.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::domain::{InstrumentId, InstrumentTick, LiquidationInstruction, Snapshot};
use crate::risk::RiskModel;
use crate::validation::{find_defects, MalformedTickPolicy, SnapshotError};

/// Default drawdown allowed from the trailing high (5%).
pub const DEFAULT_MAXIMUM_DRAWDOWN_FRACTION: f64 = 0.05;

/// Per-instrument state.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrailingHigh {
    high: f64,
}

/// Trailing-stop risk model over a set of instruments.
#[derive(Debug, Clone)]
pub struct DrawdownRiskMonitor {
    maximum_drawdown_fraction: f64,
    policy: MalformedTickPolicy,
    trailing_highs: HashMap<InstrumentId, TrailingHigh>,
}

impl Default for DrawdownRiskMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MAXIMUM_DRAWDOWN_FRACTION)
    }
}

impl DrawdownRiskMonitor {
    /// Create a monitor. The sign of `maximum_drawdown_fraction` is dropped.
    pub fn new(maximum_drawdown_fraction: f64) -> Self {
        Self::with_policy(maximum_drawdown_fraction, MalformedTickPolicy::default())
    }

    pub fn with_policy(maximum_drawdown_fraction: f64, policy: MalformedTickPolicy) -> Self {
        Self {
            maximum_drawdown_fraction: maximum_drawdown_fraction.abs(),
            policy,
            trailing_highs: HashMap::new(),
        }
    }

    pub fn maximum_drawdown_fraction(&self) -> f64 {
        self.maximum_drawdown_fraction
    }

    pub fn policy(&self) -> MalformedTickPolicy {
        self.policy
    }

    /// Stored trailing high, if the instrument is currently tracked.
    pub fn trailing_high(&self, identifier: &InstrumentId) -> Option<f64> {
        self.trailing_highs.get(identifier).map(|t| t.high)
    }

    /// Price below which a tick-low triggers liquidation, if tracked.
    pub fn threshold(&self, identifier: &InstrumentId) -> Option<f64> {
        self.trailing_high(identifier).map(|h| self.threshold_for(h))
    }

    pub fn tracked_count(&self) -> usize {
        self.trailing_highs.len()
    }

    pub fn is_tracking(&self, identifier: &InstrumentId) -> bool {
        self.trailing_highs.contains_key(identifier)
    }

    fn threshold_for(&self, high: f64) -> f64 {
        high * (1.0 - self.maximum_drawdown_fraction)
    }

    /// Fails with the first malformed entry under `MalformedTickPolicy::Reject`;
    /// always succeeds under the other policies. Never mutates state.
    pub fn check(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if self.policy != MalformedTickPolicy::Reject {
            return Ok(());
        }
        match find_defects(snapshot).into_iter().next() {
            Some((index, defect)) => Err(SnapshotError::Malformed {
                index,
                identifier: snapshot.entries[index].identifier.clone(),
                defect,
            }),
            None => Ok(()),
        }
    }

    /// Apply one tick and return the instruments to flatten.
    ///
    /// Instructions come out in snapshot order. Only `MalformedTickPolicy::Reject`
    /// can return an error, and in that case no state has been touched.
    pub fn evaluate(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        let skipped: HashSet<usize> = match self.policy {
            MalformedTickPolicy::Trust => HashSet::new(),
            MalformedTickPolicy::Skip => find_defects(snapshot)
                .into_iter()
                .map(|(index, defect)| {
                    warn!(
                        time = %snapshot.time,
                        index,
                        identifier = %snapshot.entries[index].identifier,
                        %defect,
                        "skipping malformed tick entry"
                    );
                    index
                })
                .collect(),
            MalformedTickPolicy::Reject => {
                self.check(snapshot)?;
                HashSet::new()
            }
        };

        let mut instructions = Vec::new();
        for (index, tick) in snapshot.entries.iter().enumerate() {
            if skipped.contains(&index) {
                continue;
            }
            if let Some(instruction) = self.apply(tick) {
                info!(
                    time = %snapshot.time,
                    identifier = %instruction.identifier,
                    low = tick.low,
                    trailing_high = ?self.trailing_high(&tick.identifier),
                    "drawdown limit breached, liquidating"
                );
                instructions.push(instruction);
            }
        }

        Ok(instructions)
    }

    fn apply(&mut self, tick: &InstrumentTick) -> Option<LiquidationInstruction> {
        if !tick.invested {
            if self.trailing_highs.remove(&tick.identifier).is_some() {
                debug!(identifier = %tick.identifier, "flat, trailing high evicted");
            }
            return None;
        }

        match self.trailing_highs.get_mut(&tick.identifier) {
            None => {
                debug!(identifier = %tick.identifier, high = tick.high, "trailing high established");
                self.trailing_highs
                    .insert(tick.identifier.clone(), TrailingHigh { high: tick.high });
                None
            }
            Some(record) if record.high < tick.high => {
                debug!(
                    identifier = %tick.identifier,
                    from = record.high,
                    to = tick.high,
                    "trailing high advanced"
                );
                record.high = tick.high;
                None
            }
            Some(record) => {
                let high = record.high;
                if tick.low < self.threshold_for(high) {
                    Some(LiquidationInstruction::flatten(tick.identifier.clone()))
                } else {
                    None
                }
            }
        }
    }
}

impl RiskModel for DrawdownRiskMonitor {
    fn name(&self) -> &str {
        "trailing_stop"
    }

    fn check(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        DrawdownRiskMonitor::check(self, snapshot)
    }

    fn manage_risk(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        self.evaluate(snapshot)
    }
}
