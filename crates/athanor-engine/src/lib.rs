//! Phase pipeline orchestration for athanor
//!
//! This crate wires phase handlers, the keyword classifier, and the
//! provider registry into the chain orchestrator: concurrent,
//! worker-pool-bounded generation chains with per-call timeouts and
//! partial-failure tolerance.

mod classifier;
mod orchestrator;
mod phases;

pub use classifier::{Classification, classify};
pub use orchestrator::{ChainReport, EngineError, EngineOptions, EngineOutcome, PhaseEngine};
pub use phases::{PhaseHandler, handler_for};
