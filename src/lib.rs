//! pattern-engine: Time-Series Pattern Recognition & Anomaly Detection
//!
//! Viability-model engine for numeric telemetry streams.
//!
//! ## Architecture
//!
//! - **Temporal Detector**: windowed discrimination of periodicity, trends,
//!   bursts, decays, and cycles
//! - **Correlation Analyzer**: multi-method pairwise scoring, lead/lag
//!   profiling, Granger-style causal networks
//! - **Anomaly Detector**: statistical, isolation-forest, LOF, and
//!   variety-ratio strategies with severity classification
//! - **Engine Coordinator**: fuses detector output into a viability score
//!   and raises out-of-band algedonic signals for critical threats

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod stats;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod temporal;
pub mod types;

// Re-export engine configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    AnomalyDetail, AnomalyResult, ClassifiedAnomaly, CorrelationResult, DetectedPattern,
    DetectionMethod, PatternKind, Relationship, Severity, TemporalPatterns, VarietyViolation,
    Viability, VsmState,
};

// Re-export the detectors and coordinator
pub use anomaly::{AnomalyDetector, DetectionOptions};
pub use correlation::{CorrelationAnalyzer, CorrelationMethod};
pub use engine::{EngineCoordinator, SystemState};
pub use temporal::TemporalDetector;

// Re-export the persistence boundary
pub use store::{HttpVectorStore, StoreError, VectorStore};

// Re-export telemetry
pub use telemetry::{TelemetryEmitter, TelemetryEvent};
