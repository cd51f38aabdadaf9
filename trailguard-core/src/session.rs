//! Session driver - pulls ticks from a feed, runs the risk model, forwards
//! instructions to the executor.
//!
//! Ticks must arrive in strictly increasing time order; a trailing high is
//! meaningless otherwise, so an out-of-order snapshot ends the session.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::executor::{ExecutorError, OrderExecutor};
use crate::feed::{FeedError, PositionFeed};
use crate::risk::RiskModel;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("snapshot at {found} does not follow previous snapshot at {previous}")]
    OutOfOrder {
        previous: NaiveDateTime,
        found: NaiveDateTime,
    },
}

/// What happened over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Snapshots pulled from the feed, rejected ones included.
    pub ticks: usize,
    /// Instructions the executor accepted.
    pub instructions: usize,
    /// Snapshots the model refused as malformed.
    pub rejected_ticks: usize,
    /// Instructions the executor refused.
    pub executor_failures: usize,
    pub first_tick: Option<NaiveDateTime>,
    pub last_tick: Option<NaiveDateTime>,
}

/// Run `model` over every snapshot `feed` produces.
pub fn run_session<F, E>(
    feed: &mut F,
    model: &mut dyn RiskModel,
    executor: &mut E,
    config: &SessionConfig,
) -> Result<SessionSummary, SessionError>
where
    F: PositionFeed + ?Sized,
    E: OrderExecutor + ?Sized,
{
    info!(model = model.name(), "session started");
    let mut summary = SessionSummary::default();

    while let Some(snapshot) = feed.next_snapshot()? {
        if let Some(previous) = summary.last_tick {
            if snapshot.time <= previous {
                return Err(SessionError::OutOfOrder {
                    previous,
                    found: snapshot.time,
                });
            }
        }
        summary.ticks += 1;
        summary.first_tick.get_or_insert(snapshot.time);
        summary.last_tick = Some(snapshot.time);

        let instructions = match model.manage_risk(&snapshot) {
            Ok(instructions) => instructions,
            Err(e) => {
                warn!(time = %snapshot.time, error = %e, "snapshot rejected");
                summary.rejected_ticks += 1;
                continue;
            }
        };
        debug!(
            time = %snapshot.time,
            entries = snapshot.len(),
            instructions = instructions.len(),
            "tick evaluated"
        );

        for instruction in &instructions {
            match executor.submit(snapshot.time, instruction) {
                Ok(()) => summary.instructions += 1,
                Err(e) if config.stop_on_executor_error => return Err(e.into()),
                Err(e) => {
                    error!(
                        time = %snapshot.time,
                        identifier = %instruction.identifier,
                        error = %e,
                        "executor refused instruction"
                    );
                    summary.executor_failures += 1;
                }
            }
        }
    }

    info!(
        ticks = summary.ticks,
        instructions = summary.instructions,
        rejected_ticks = summary.rejected_ticks,
        executor_failures = summary.executor_failures,
        "session finished"
    );
    Ok(summary)
}
