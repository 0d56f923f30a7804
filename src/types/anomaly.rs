//! Anomaly detection records: methods, severities, classified anomalies.

use serde::{Deserialize, Serialize};

/// Detection strategy used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Statistical,
    IsolationForest,
    Lof,
    VsmBased,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::IsolationForest => "isolation_forest",
            Self::Lof => "lof",
            Self::VsmBased => "vsm_based",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity ladder. Ordering is significance order, so `max()` over a set of
/// severities yields the overall level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Variety-management violation detected by the VSM method.
///
/// Listed in evaluation order; the first matching violation wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarietyViolation {
    /// Variety ratio below 0.5 — the system cannot absorb its environment.
    InsufficientVariety,
    /// Variety ratio above 2.0 — unfiltered complexity flooding upward.
    ExcessiveVariety,
    /// Value magnitude inconsistent with the expected recursion depth.
    RecursionBreakdown,
    /// Magnitude beyond the algedonic threshold — viability threat.
    AlgedonicAlert,
}

impl std::fmt::Display for VarietyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InsufficientVariety => "insufficient_variety",
            Self::ExcessiveVariety => "excessive_variety",
            Self::RecursionBreakdown => "recursion_breakdown",
            Self::AlgedonicAlert => "algedonic_alert",
        };
        write!(f, "{s}")
    }
}

/// Method-specific fields of a classified anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyDetail {
    Statistical {
        z_score: f64,
        /// Absolute deviation from the baseline mean.
        deviation: f64,
    },
    Isolation {
        score: f64,
    },
    Lof {
        score: f64,
    },
    Vsm {
        variety: f64,
        variety_ratio: f64,
        violation: VarietyViolation,
    },
}

/// One flagged data point with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAnomaly {
    /// Index into the analyzed data sequence.
    pub index: usize,
    pub value: f64,
    pub severity: Severity,
    pub detail: AnomalyDetail,
}

/// Full result of one anomaly detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Opaque identifier (`anom_` prefix).
    pub id: String,
    /// Epoch milliseconds at detection time.
    pub timestamp: i64,
    pub method: DetectionMethod,
    /// Size of the analyzed input.
    pub data_points: usize,
    pub anomaly_detected: bool,
    pub anomaly_count: usize,
    pub anomalies: Vec<ClassifiedAnomaly>,
    /// Highest individual severity; `None` when nothing was flagged.
    pub severity: Severity,
    /// True iff any individual anomaly is critical.
    pub critical: bool,
    /// Human-readable summary naming the flagged indices.
    pub description: String,
    pub recommendations: Vec<String>,
}

/// Viability verdict returned alongside anomaly detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viability {
    /// variety_ratio >= 1.0 and no critical anomaly.
    pub viable: bool,
    pub variety_ratio: f64,
    pub recommendations: Vec<String>,
}
