//! Domain types for Trailguard

pub mod ids;
pub mod instruction;
pub mod tick;

pub use ids::InstrumentId;
pub use instruction::LiquidationInstruction;
pub use tick::{InstrumentTick, Snapshot};
