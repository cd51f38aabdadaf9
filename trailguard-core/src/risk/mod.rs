//! Risk models - turn a tick snapshot into liquidation instructions.
//!
//! ## Concrete implementations
//!
//! - [`DrawdownRiskMonitor`](crate::monitor::DrawdownRiskMonitor) - trailing-high drawdown stop
//! - [`NullRiskModel`] - never intervenes
//! - [`CompositeRiskModel`] - runs several models over the same tick

pub mod factory;

pub use factory::build_risk_model;

use std::collections::HashSet;

use crate::domain::{InstrumentId, LiquidationInstruction, Snapshot};
use crate::validation::SnapshotError;

/// Trait for risk models.
///
/// # Architecture invariants
/// - Called once per tick, in time order, by a single driver.
/// - Models own their state; the snapshot is the only input.
/// - A model that returns `Err` has not mutated its state for that tick.
/// - `manage_risk` fails only if `check` would have failed on the same snapshot.
pub trait RiskModel: Send {
    /// Human-readable name (e.g., "trailing_stop", "null").
    fn name(&self) -> &str;

    /// Decide, without touching state, whether `manage_risk` would refuse
    /// this snapshot.
    fn check(&self, _snapshot: &Snapshot) -> Result<(), SnapshotError> {
        Ok(())
    }

    /// Evaluate one tick and return the instruments to flatten.
    fn manage_risk(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError>;
}

/// Risk model that never emits. Used as the default in tests and for
/// sessions that only want the driver plumbing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRiskModel;

impl RiskModel for NullRiskModel {
    fn name(&self) -> &str {
        "null"
    }

    fn manage_risk(
        &mut self,
        _snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        Ok(Vec::new())
    }
}

/// Runs each child model on the same snapshot, in order.
///
/// Results are merged to one instruction per identifier, first occurrence
/// wins. Every child is checked before any child runs, so a snapshot one
/// child refuses leaves all of them untouched.
pub struct CompositeRiskModel {
    models: Vec<Box<dyn RiskModel>>,
}

impl CompositeRiskModel {
    pub fn new(models: Vec<Box<dyn RiskModel>>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }
}

impl RiskModel for CompositeRiskModel {
    fn name(&self) -> &str {
        "composite"
    }

    fn check(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.models.iter().try_for_each(|model| model.check(snapshot))
    }

    fn manage_risk(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
        self.check(snapshot)?;

        let mut seen: HashSet<InstrumentId> = HashSet::new();
        let mut merged = Vec::new();

        for model in &mut self.models {
            for instruction in model.manage_risk(snapshot)? {
                if seen.insert(instruction.identifier.clone()) {
                    merged.push(instruction);
                }
            }
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentTick;
    use crate::monitor::DrawdownRiskMonitor;
    use crate::validation::{MalformedTickPolicy, TickDefect};
    use chrono::NaiveDate;

    fn snap(minute: u32, entries: Vec<InstrumentTick>) -> Snapshot {
        let time = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap();
        Snapshot::new(time, entries)
    }

    #[test]
    fn null_model_never_emits() {
        let mut model = NullRiskModel;
        let out = model
            .manage_risk(&snap(0, vec![InstrumentTick::invested("SPY", 1.0, 0.0)]))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn composite_dedupes_by_identifier() {
        let mut composite = CompositeRiskModel::new(vec![
            Box::new(DrawdownRiskMonitor::new(0.05)),
            Box::new(DrawdownRiskMonitor::new(0.10)),
            Box::new(NullRiskModel),
        ]);
        assert_eq!(
            composite.model_names(),
            vec!["trailing_stop", "trailing_stop", "null"]
        );

        composite
            .manage_risk(&snap(0, vec![InstrumentTick::invested("SPY", 100.0, 100.0)]))
            .unwrap();
        // 80 breaches both the 5% and the 10% stop.
        let out = composite
            .manage_risk(&snap(1, vec![InstrumentTick::invested("SPY", 90.0, 80.0)]))
            .unwrap();
        assert_eq!(out, vec![LiquidationInstruction::flatten("SPY".into())]);
    }

    #[test]
    fn composite_emits_when_any_child_does() {
        let mut composite = CompositeRiskModel::new(vec![
            Box::new(DrawdownRiskMonitor::new(0.20)),
            Box::new(DrawdownRiskMonitor::new(0.05)),
        ]);
        composite
            .manage_risk(&snap(0, vec![InstrumentTick::invested("SPY", 100.0, 100.0)]))
            .unwrap();
        // 93 breaches 5% but not 20%.
        let out = composite
            .manage_risk(&snap(1, vec![InstrumentTick::invested("SPY", 99.0, 93.0)]))
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn composite_rejection_leaves_every_child_untouched() {
        let mut composite = CompositeRiskModel::new(vec![
            Box::new(DrawdownRiskMonitor::with_policy(0.05, MalformedTickPolicy::Trust)),
            Box::new(DrawdownRiskMonitor::with_policy(0.05, MalformedTickPolicy::Reject)),
        ]);
        composite
            .manage_risk(&snap(0, vec![InstrumentTick::invested("X", 100.0, 100.0)]))
            .unwrap();

        // Y has low above high; the reject child refuses the whole tick.
        let bad = snap(
            1,
            vec![
                InstrumentTick::invested("X", 99.0, 80.0),
                InstrumentTick::invested("Y", 10.0, 12.0),
                InstrumentTick::invested("Z", 50.0, 50.0),
            ],
        );
        assert!(composite.check(&bad).is_err());
        let err = composite.manage_risk(&bad).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Malformed {
                index: 1,
                defect: TickDefect::InvertedRange { .. },
                ..
            }
        ));

        // Z was never established by the trust child, so this is its first
        // sighting; X is still tracked at 100 and still breached.
        let out = composite
            .manage_risk(&snap(
                2,
                vec![
                    InstrumentTick::invested("X", 99.0, 80.0),
                    InstrumentTick::invested("Z", 50.0, 40.0),
                ],
            ))
            .unwrap();
        assert_eq!(out, vec![LiquidationInstruction::flatten("X".into())]);
    }

    #[test]
    fn null_model_accepts_anything() {
        let bad = snap(0, vec![InstrumentTick::invested("", f64::NAN, 1.0)]);
        assert!(NullRiskModel.check(&bad).is_ok());
    }

    #[test]
    fn trait_objects_are_send() {
        fn require_send<T: Send>() {}
        require_send::<Box<dyn RiskModel>>();
        require_send::<CompositeRiskModel>();
    }
}
