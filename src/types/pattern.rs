//! Temporal pattern records and the aggregated detection result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trend subtype classified from the OLS slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Flat,
    Increasing,
    Decreasing,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// A single above-threshold excursion inside a burst pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstEvent {
    /// Index within the analyzed window.
    pub index: usize,
    /// Excess over the window mean.
    pub magnitude: f64,
}

/// A single cycle between two zero crossings of the mean-centered series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSpan {
    pub start: usize,
    pub end: usize,
    pub duration: usize,
}

/// Detected temporal structure, tagged by kind.
///
/// Every variant carries a strength in [0, 1]; records only exist when the
/// analyzer's confidence gate passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternKind {
    Periodic {
        /// Dominant period in samples (> 0).
        period: f64,
        strength: f64,
        /// 1 / period.
        frequency: f64,
        /// Phase offset in radians.
        phase: f64,
    },
    Trend {
        direction: TrendDirection,
        slope: f64,
        r_squared: f64,
        /// Absolute change per sample.
        rate: f64,
    },
    Burst {
        events: Vec<BurstEvent>,
        strength: f64,
        count: usize,
        avg_magnitude: f64,
    },
    Decay {
        /// Exponential decay rate (> 0).
        rate: f64,
        /// ln 2 / rate, in samples.
        half_life: f64,
        r_squared: f64,
        /// Projected samples until the signal falls to 1% of its start.
        time_to_one_percent: f64,
    },
    Cyclic {
        cycles: Vec<CycleSpan>,
        /// Regularity of cycle durations, 1 / (1 + cv).
        strength: f64,
        /// Coefficient of variation of cycle durations.
        variability: f64,
    },
}

impl PatternKind {
    /// Strength in [0, 1] regardless of variant.
    pub fn strength(&self) -> f64 {
        match self {
            Self::Periodic { strength, .. }
            | Self::Burst { strength, .. }
            | Self::Cyclic { strength, .. } => *strength,
            Self::Trend { r_squared, .. } | Self::Decay { r_squared, .. } => *r_squared,
        }
    }

    /// Stable name used as the summary grouping key.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Periodic { .. } => "periodic",
            Self::Trend { .. } => "trend",
            Self::Burst { .. } => "burst",
            Self::Decay { .. } => "decay",
            Self::Cyclic { .. } => "cyclic",
        }
    }
}

/// A pattern plus the window it was detected in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Start offset of the source window in the original series.
    pub window_start: usize,
    pub pattern: PatternKind,
}

/// Per-kind aggregate over all detected patterns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternTypeSummary {
    pub count: usize,
    pub avg_strength: f64,
    pub max_strength: f64,
}

/// Aggregated output of the temporal detector over one input series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalPatterns {
    /// Opaque identifier (`pat_` prefix).
    pub id: String,
    /// Epoch milliseconds at analysis time.
    pub timestamp: i64,
    /// Length of the original input series.
    pub data_points: usize,
    /// All patterns across all windows, in window order.
    pub patterns: Vec<DetectedPattern>,
    /// Grouped by kind name.
    pub summary: HashMap<String, PatternTypeSummary>,
    /// Single highest-strength pattern, if any were detected.
    pub dominant: Option<DetectedPattern>,
    /// Overall confidence in [0, 1]; 0 when no patterns were found.
    pub confidence: f64,
}
