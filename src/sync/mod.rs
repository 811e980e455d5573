//! Per-display synchronization: the tick decision procedure, its state
//! machine, and the task wrapper the shell talks to.

mod controller;
mod engine;
mod state;

pub use controller::SyncController;
pub use engine::{EngineCommand, SyncConfig, SyncEngine, TickOutcome};
pub use state::{DisplayPhase, SyncSnapshot, SyncState};
