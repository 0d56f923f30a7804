//! Shared data structures for the pattern-recognition engine
//!
//! This module defines the core records that flow between subsystems:
//! - Temporal detection: PatternKind, DetectedPattern, TemporalPatterns
//! - Correlation analysis: CorrelationMatrix, Relationship, CausalAnalysis
//! - Anomaly detection: ClassifiedAnomaly, AnomalyResult, Viability
//! - Viability model: VsmState, AlgedonicChannel
//! - Identifier minting: `pat_` / `anom_` / `corr_` ids
//!
//! All records are immutable values once produced by a detector; only the
//! engine coordinator mutates state, and only inside its own lock.

mod anomaly;
mod correlation;
pub mod ids;
mod pattern;
mod vsm;

pub use anomaly::*;
pub use correlation::*;
pub use pattern::*;
pub use vsm::*;
