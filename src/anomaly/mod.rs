//! Anomaly Detection - four strategies under one dispatcher
//!
//! - **statistical**: z-scores against a learned baseline with a dynamic,
//!   tail-shape-adjusted threshold
//! - **isolation_forest**: 100 random binary trees; short average paths mark
//!   easily isolated values
//! - **lof**: local reachability density compared against the k-neighborhood
//! - **vsm_based**: variety-ratio screening against the viability model with
//!   an algedonic magnitude gate
//!
//! The detector classifies each flagged point, derives the overall severity,
//! and phrases operator recommendations. Batch mode fans out per-stream
//! tasks under a fixed deadline.

mod detector;
mod isolation_forest;
mod lof;
mod vsm;

pub use detector::{AnomalyDetector, DetectionOptions};
pub use isolation_forest::IsolationForest;
pub use lof::{lof_score, neighborhood_size};
pub use vsm::{sequence_variety, variety, VsmBaseline};
