//! Variety-based anomaly detection for the viability model.
//!
//! Variety is a scalar complexity surrogate: |v| · ln(|v| + 1). The
//! baseline summarizes expected variety, the algedonic magnitude threshold,
//! and the viable Tukey range; each checked value is classified against the
//! violation ladder in a fixed evaluation order.

use serde::{Deserialize, Serialize};

use crate::stats::{self, RunningStats};
use crate::types::{VarietyViolation, VsmState};

/// Variety ratio below this indicates the system cannot absorb demand.
const INSUFFICIENT_RATIO: f64 = 0.5;

/// Variety ratio above this indicates unattenuated complexity.
const EXCESSIVE_RATIO: f64 = 2.0;

/// Allowed deviation of log2-magnitude from the recursion depth.
const RECURSION_TOLERANCE: f64 = 2.0;

/// Sigma multiplier for the algedonic magnitude threshold.
const ALGEDONIC_SIGMA: f64 = 4.0;

/// Tukey fence multiplier for the viable range.
const VIABLE_IQR_FENCE: f64 = 1.5;

/// Variety surrogate for a scalar observation.
pub fn variety(value: f64) -> f64 {
    let magnitude = value.abs();
    magnitude * (magnitude + 1.0).ln()
}

/// Variety surrogate for a sequence: the count of distinct values.
///
/// Values are keyed by their bit pattern, so -0.0 and 0.0 count separately
/// and NaN never equals itself.
pub fn sequence_variety(values: &[f64]) -> f64 {
    let unique: std::collections::HashSet<u64> = values.iter().map(|v| v.to_bits()).collect();
    unique.len() as f64
}

/// Baseline statistics the VSM detector classifies against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsmBaseline {
    /// Mean variety over the baseline values.
    pub expected_variety: f64,
    /// Standard deviation of baseline variety.
    pub variety_std: f64,
    /// Nested control tiers; fixed at 5 in this engine.
    pub recursion_depth: f64,
    /// mean(|baseline|) + 4 · std(|baseline|).
    pub algedonic_threshold: f64,
    /// Tukey range [Q1 - 1.5 · IQR, Q3 + 1.5 · IQR] over the baseline.
    pub viable_range: (f64, f64),
}

impl VsmBaseline {
    /// Summarize a raw baseline sequence.
    pub fn from_values(baseline: &[f64], recursion_depth: f64) -> Self {
        let varieties: Vec<f64> = baseline.iter().map(|&v| variety(v)).collect();
        let variety_stats = RunningStats::from_values(&varieties);

        let magnitudes: Vec<f64> = baseline.iter().map(|v| v.abs()).collect();
        let magnitude_stats = RunningStats::from_values(&magnitudes);

        let (q1, q3) = stats::quartiles(baseline);
        let iqr = q3 - q1;

        Self {
            expected_variety: variety_stats.mean(),
            variety_std: variety_stats.std_dev(),
            recursion_depth,
            algedonic_threshold: magnitude_stats.mean()
                + ALGEDONIC_SIGMA * magnitude_stats.std_dev(),
            viable_range: (q1 - VIABLE_IQR_FENCE * iqr, q3 + VIABLE_IQR_FENCE * iqr),
        }
    }

    /// Baseline derived from the engine's current VSM state: the level
    /// varieties stand in for observed data.
    pub fn from_state(state: &VsmState, recursion_depth: f64) -> Self {
        Self::from_values(&state.level_varieties(), recursion_depth)
    }

    /// Variety ratio of a value against the expected baseline variety.
    pub fn variety_ratio(&self, value: f64) -> f64 {
        if self.expected_variety <= 0.0 {
            return 0.0;
        }
        variety(value) / self.expected_variety
    }

    /// First matching violation, in the fixed evaluation order:
    /// insufficient, excessive, recursion breakdown, algedonic alert.
    pub fn check(&self, value: f64) -> Option<VarietyViolation> {
        let ratio = self.variety_ratio(value);
        if ratio < INSUFFICIENT_RATIO {
            return Some(VarietyViolation::InsufficientVariety);
        }
        if ratio > EXCESSIVE_RATIO {
            return Some(VarietyViolation::ExcessiveVariety);
        }
        let recursion_level = (value.abs() + 1.0).log2();
        if (recursion_level - self.recursion_depth).abs() > RECURSION_TOLERANCE {
            return Some(VarietyViolation::RecursionBreakdown);
        }
        if value.abs() > self.algedonic_threshold {
            return Some(VarietyViolation::AlgedonicAlert);
        }
        None
    }
}
