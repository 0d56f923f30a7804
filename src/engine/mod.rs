//! Engine Coordination - state machine over the three detector subsystems
//!
//! The coordinator aggregates temporal, correlation, and anomaly output
//! into a single viability state: VSM recursion levels, the algedonic
//! channel, retention-capped artifact maps, and monotonic counters. A
//! scheduler task re-runs the pipeline over recent store data at the
//! configured cadence.

mod coordinator;

pub use coordinator::{EngineCoordinator, EngineCounters, SystemState};
