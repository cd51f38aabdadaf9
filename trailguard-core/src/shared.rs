//! Shared monitor handle for hosts that evaluate from more than one thread.
//!
//! One lock covers the whole trailing-high map for the duration of a tick,
//! so concurrent callers see ticks applied one at a time. Tick ordering is
//! still the caller's job.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{InstrumentId, LiquidationInstruction, Snapshot};
use crate::monitor::DrawdownRiskMonitor;
use crate::risk::RiskModel;
use crate::validation::SnapshotError;

/// Clone-able handle to a single [`DrawdownRiskMonitor`].
#[derive(Debug, Clone)]
pub struct SharedMonitor {
    inner: Arc<Mutex<DrawdownRiskMonitor>>,
}

impl SharedMonitor {
    pub fn new(monitor: DrawdownRiskMonitor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(monitor)),
        }
    }

    // `evaluate` has no panicking path (defect indices come from the same
    // snapshot), so a poisoned lock can only come from a caller's own panic
    // while holding the guard; the map itself is still usable.
    fn lock(&self) -> MutexGuard<'_, DrawdownRiskMonitor> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn evaluate(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        self.lock().evaluate(snapshot)
    }

    pub fn check(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.lock().check(snapshot)
    }

    pub fn trailing_high(&self, identifier: &InstrumentId) -> Option<f64> {
        self.lock().trailing_high(identifier)
    }

    pub fn tracked_count(&self) -> usize {
        self.lock().tracked_count()
    }
}

impl RiskModel for SharedMonitor {
    fn name(&self) -> &str {
        "trailing_stop"
    }

    fn check(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        SharedMonitor::check(self, snapshot)
    }

    fn manage_risk(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        self.evaluate(snapshot)
    }
}
