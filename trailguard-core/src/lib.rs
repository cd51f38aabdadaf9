//! Trailguard Core - trailing-high drawdown monitoring for a set of instruments.
//!
//! This crate contains:
//! - Domain types (instrument ids, tick snapshots, liquidation instructions)
//! - The trailing-high drawdown monitor
//! - The risk-model seam (null and composite models, config factory)
//! - Malformed-entry policies
//! - Position feeds (in-memory, CSV) and order executors (recording, JSON lines)
//! - A session driver and a lock-guarded shared monitor

pub mod config;
pub mod domain;
pub mod executor;
pub mod feed;
pub mod monitor;
pub mod risk;
pub mod session;
pub mod shared;
pub mod validation;

pub use config::{ConfigError, ModelConfig, MonitorConfig, SessionConfig};
pub use domain::{InstrumentId, InstrumentTick, LiquidationInstruction, Snapshot};
pub use executor::{ExecutorError, JsonLinesExecutor, OrderExecutor, RecordingExecutor};
pub use feed::{CsvTickFeed, FeedError, PositionFeed, VecFeed};
pub use monitor::{DrawdownRiskMonitor, DEFAULT_MAXIMUM_DRAWDOWN_FRACTION};
pub use risk::{build_risk_model, CompositeRiskModel, NullRiskModel, RiskModel};
pub use session::{run_session, SessionError, SessionSummary};
pub use shared::SharedMonitor;
pub use validation::{MalformedTickPolicy, SnapshotError, TickDefect};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: state and data types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<InstrumentId>();
        require_sync::<InstrumentId>();
        require_send::<InstrumentTick>();
        require_sync::<InstrumentTick>();
        require_send::<Snapshot>();
        require_sync::<Snapshot>();
        require_send::<LiquidationInstruction>();
        require_sync::<LiquidationInstruction>();
        require_send::<DrawdownRiskMonitor>();
        require_sync::<DrawdownRiskMonitor>();
        require_send::<SharedMonitor>();
        require_sync::<SharedMonitor>();
        require_send::<MonitorConfig>();
        require_sync::<MonitorConfig>();
    }

    /// Architecture contract: risk models see only the snapshot.
    ///
    /// `manage_risk()` takes `&Snapshot` and nothing from the executor, so a
    /// model cannot observe whether its instructions were honored.
    #[test]
    fn risk_model_trait_has_no_executor_parameter() {
        fn _check_trait_object_builds(
            model: &mut dyn RiskModel,
            snapshot: &Snapshot,
        ) -> Result<Vec<LiquidationInstruction>, SnapshotError> {
            model.manage_risk(snapshot)
        }
    }
}
