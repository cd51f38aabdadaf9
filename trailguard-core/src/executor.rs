//! Order executors - the downstream sink for liquidation instructions.
//!
//! The executor owns actually flattening the position. Nothing here feeds
//! back into the risk model; a position is only known to be closed once the
//! feed reports it flat.

use std::io::Write;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::domain::LiquidationInstruction;

/// Errors from an executor refusing or failing to accept an instruction.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("write instruction: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode instruction: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("instruction for '{identifier}' rejected: {reason}")]
    Rejected { identifier: String, reason: String },
}

/// Downstream sink for liquidation instructions.
pub trait OrderExecutor {
    /// Accept one instruction issued at tick `time`.
    fn submit(
        &mut self,
        time: NaiveDateTime,
        instruction: &LiquidationInstruction,
    ) -> Result<(), ExecutorError>;
}

/// An instruction as it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedInstruction {
    pub time: NaiveDateTime,
    #[serde(flatten)]
    pub instruction: LiquidationInstruction,
}

/// Keeps every submitted instruction in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    pub submitted: Vec<SubmittedInstruction>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers in submission order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.submitted
            .iter()
            .map(|s| s.instruction.identifier.as_str())
            .collect()
    }
}

impl OrderExecutor for RecordingExecutor {
    fn submit(
        &mut self,
        time: NaiveDateTime,
        instruction: &LiquidationInstruction,
    ) -> Result<(), ExecutorError> {
        self.submitted.push(SubmittedInstruction {
            time,
            instruction: instruction.clone(),
        });
        Ok(())
    }
}

/// Writes each instruction as one JSON object per line.
pub struct JsonLinesExecutor<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesExecutor<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OrderExecutor for JsonLinesExecutor<W> {
    fn submit(
        &mut self,
        time: NaiveDateTime,
        instruction: &LiquidationInstruction,
    ) -> Result<(), ExecutorError> {
        let record = SubmittedInstruction {
            time,
            instruction: instruction.clone(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
