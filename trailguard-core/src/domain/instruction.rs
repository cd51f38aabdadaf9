//! Liquidation instruction - the only output of a risk model.

use serde::{Deserialize, Serialize};

use super::InstrumentId;

/// Directive to bring an instrument's target position size to zero.
///
/// The executor owns submitting and confirming the closing trade. Whether it
/// was honored is only visible later, when the feed reports the instrument flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationInstruction {
    pub identifier: InstrumentId,
    /// Always zero for a liquidation; kept explicit for the executor contract.
    pub target_size: f64,
}

impl LiquidationInstruction {
    pub fn flatten(identifier: InstrumentId) -> Self {
        Self {
            identifier,
            target_size: 0.0,
        }
    }
}
