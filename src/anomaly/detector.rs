//! Anomaly Detector - method dispatch, classification, severity, batch mode.
//!
//! Dispatches a data/baseline pair to one of four strategies, classifies
//! every flagged point, derives the overall severity, and phrases operator
//! recommendations. Batch mode fans out one task per stream and joins with
//! a fixed deadline; stragglers are abandoned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::isolation_forest::IsolationForest;
use super::lof::{lof_score, neighborhood_size};
use super::vsm::VsmBaseline;
use crate::stats;
use crate::types::{
    ids, AnomalyDetail, AnomalyResult, ClassifiedAnomaly, DetectionMethod, Severity,
    VarietyViolation, VsmState, RECURSION_LEVELS,
};

/// Base z-score threshold for the statistical method.
const STATISTICAL_BASE_THRESHOLD: f64 = 3.0;

/// Adjustment applied by the tail-shape heuristic.
const THRESHOLD_ADJUSTMENT: f64 = 0.5;

/// IQR/sigma above this counts as heavy-tailed.
const HEAVY_TAIL_RATIO: f64 = 1.5;

/// IQR/sigma below this counts as light-tailed.
const LIGHT_TAIL_RATIO: f64 = 0.8;

/// Isolation forest score gate.
const ISOLATION_FLAG: f64 = 0.6;

/// Isolation score promoting an anomaly to high severity.
const ISOLATION_HIGH: f64 = 0.8;

/// LOF gate.
const LOF_FLAG: f64 = 1.5;

/// LOF promoting an anomaly to medium severity.
const LOF_MEDIUM: f64 = 2.0;

/// |z| promoting a statistical anomaly to high severity.
const Z_HIGH: f64 = 4.0;

/// Anomaly rate above which the baseline itself is suspect.
const BASELINE_REVIEW_RATE: f64 = 0.2;

/// Join deadline for batch fan-out.
const BATCH_DEADLINE: Duration = Duration::from_secs(5);

/// Most indices listed in the human description before truncation.
const DESCRIPTION_INDEX_CAP: usize = 10;

/// Per-run detection options.
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    pub method: DetectionMethod,
    /// Overrides the method's default flag threshold when set.
    pub threshold: Option<f64>,
    /// Isolation forest splitter seed; entropy-seeded when unset.
    pub forest_seed: Option<u64>,
    /// VSM recursion depth the vsm_based method classifies against; the
    /// model default of 5 applies when unset. The engine coordinator fills
    /// this from its own configuration.
    pub recursion_depth: Option<f64>,
}

impl DetectionOptions {
    pub fn method(method: DetectionMethod) -> Self {
        Self {
            method,
            threshold: None,
            forest_seed: None,
            recursion_depth: None,
        }
    }
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self::method(DetectionMethod::Statistical)
    }
}

/// Multi-strategy anomaly detector.
///
/// Stateless between calls; clone freely across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector {
    options: DetectionOptions,
}

impl AnomalyDetector {
    pub fn new(options: DetectionOptions) -> Self {
        Self { options }
    }

    pub fn method(&self) -> DetectionMethod {
        self.options.method
    }

    /// Run detection of `data` against an explicit `baseline`.
    pub fn detect(&self, data: &[f64], baseline: &[f64]) -> AnomalyResult {
        let anomalies = match self.options.method {
            DetectionMethod::Statistical => self.detect_statistical(data, baseline),
            DetectionMethod::IsolationForest => self.detect_isolation(data, baseline),
            DetectionMethod::Lof => self.detect_lof(data, baseline),
            DetectionMethod::VsmBased => {
                let summary = VsmBaseline::from_values(baseline, self.recursion_depth());
                self.detect_vsm(data, &summary)
            }
        };
        self.finish(data, anomalies)
    }

    /// VSM detection against the engine's live state: the level varieties
    /// stand in for the baseline sequence.
    pub fn detect_against_state(&self, data: &[f64], state: &VsmState) -> AnomalyResult {
        let summary = VsmBaseline::from_state(state, self.recursion_depth());
        let anomalies = self.detect_vsm(data, &summary);
        self.finish(data, anomalies)
    }

    fn recursion_depth(&self) -> f64 {
        self.options
            .recursion_depth
            .unwrap_or(RECURSION_LEVELS as f64)
    }

    /// Fan out one detection task per stream and join within a fixed 5 s
    /// deadline. Streams that miss the deadline are abandoned; the merged
    /// map keeps only streams with detected anomalies.
    pub async fn detect_batch(
        &self,
        streams: HashMap<String, Vec<f64>>,
        baseline: Vec<f64>,
    ) -> HashMap<String, AnomalyResult> {
        let deadline = tokio::time::Instant::now() + BATCH_DEADLINE;
        let baseline = Arc::new(baseline);

        let handles: Vec<(String, tokio::task::JoinHandle<AnomalyResult>)> = streams
            .into_iter()
            .map(|(stream_id, data)| {
                let detector = *self;
                let baseline = Arc::clone(&baseline);
                let handle =
                    tokio::task::spawn_blocking(move || detector.detect(&data, &baseline));
                (stream_id, handle)
            })
            .collect();

        let outcomes = futures::future::join_all(handles.into_iter().map(
            |(stream_id, handle)| async move {
                (stream_id, tokio::time::timeout_at(deadline, handle).await)
            },
        ))
        .await;

        let mut merged = HashMap::new();
        for (stream_id, outcome) in outcomes {
            match outcome {
                Ok(Ok(result)) => {
                    if result.anomaly_detected {
                        merged.insert(stream_id, result);
                    }
                }
                Ok(Err(join_error)) => {
                    // A crashed detector task loses only its own stream.
                    warn!(stream = %stream_id, error = %join_error, "Batch detection task failed");
                }
                Err(_) => {
                    warn!(stream = %stream_id, "Batch detection missed the deadline — abandoned");
                }
            }
        }
        merged
    }

    // ------------------------------------------------------------------
    // Strategies
    // ------------------------------------------------------------------

    fn detect_statistical(&self, data: &[f64], baseline: &[f64]) -> Vec<ClassifiedAnomaly> {
        let mean = stats::mean(baseline);
        let std = stats::std_dev(baseline);
        if std <= 0.0 {
            // A flat baseline carries no scale; nothing can be flagged.
            return Vec::new();
        }

        let threshold = self
            .options
            .threshold
            .unwrap_or_else(|| dynamic_threshold(baseline, std));

        data.iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let z = (value - mean) / std;
                if z.abs() <= threshold {
                    return None;
                }
                let detail = AnomalyDetail::Statistical {
                    z_score: z,
                    deviation: (value - mean).abs(),
                };
                Some(ClassifiedAnomaly {
                    index,
                    value,
                    severity: classify(&detail),
                    detail,
                })
            })
            .collect()
    }

    fn detect_isolation(&self, data: &[f64], baseline: &[f64]) -> Vec<ClassifiedAnomaly> {
        let seed = self.options.forest_seed.unwrap_or_else(rand::random);
        let Some(forest) = IsolationForest::fit(baseline, seed) else {
            return Vec::new();
        };
        let flag = self.options.threshold.unwrap_or(ISOLATION_FLAG);

        data.iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let score = forest.score(value);
                if score <= flag {
                    return None;
                }
                let detail = AnomalyDetail::Isolation { score };
                Some(ClassifiedAnomaly {
                    index,
                    value,
                    severity: classify(&detail),
                    detail,
                })
            })
            .collect()
    }

    fn detect_lof(&self, data: &[f64], baseline: &[f64]) -> Vec<ClassifiedAnomaly> {
        if baseline.is_empty() {
            return Vec::new();
        }
        let k = neighborhood_size(baseline.len());
        let flag = self.options.threshold.unwrap_or(LOF_FLAG);

        data.iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let score = lof_score(value, baseline, k);
                if score <= flag {
                    return None;
                }
                let detail = AnomalyDetail::Lof { score };
                Some(ClassifiedAnomaly {
                    index,
                    value,
                    severity: classify(&detail),
                    detail,
                })
            })
            .collect()
    }

    fn detect_vsm(&self, data: &[f64], summary: &VsmBaseline) -> Vec<ClassifiedAnomaly> {
        data.iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let violation = summary.check(value)?;
                let detail = AnomalyDetail::Vsm {
                    variety: super::vsm::variety(value),
                    variety_ratio: summary.variety_ratio(value),
                    violation,
                };
                Some(ClassifiedAnomaly {
                    index,
                    value,
                    severity: classify(&detail),
                    detail,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Result assembly
    // ------------------------------------------------------------------

    fn finish(&self, data: &[f64], anomalies: Vec<ClassifiedAnomaly>) -> AnomalyResult {
        let severity = anomalies
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(Severity::None);
        let critical = severity == Severity::Critical;
        let description = describe(self.options.method, data.len(), &anomalies);
        let recommendations = recommend(&anomalies, data.len());

        debug!(
            method = %self.options.method,
            data_points = data.len(),
            anomalies = anomalies.len(),
            severity = %severity,
            "Anomaly detection complete"
        );

        AnomalyResult {
            id: ids::anomaly_id(),
            timestamp: ids::now_millis(),
            method: self.options.method,
            data_points: data.len(),
            anomaly_detected: !anomalies.is_empty(),
            anomaly_count: anomalies.len(),
            severity,
            critical,
            description,
            recommendations,
            anomalies,
        }
    }
}

/// Dynamic z-threshold: base 3.0, adjusted by the baseline's tail shape.
///
/// IQR/sigma above 1.5 (heavy tails) lowers the threshold by 0.5; below 0.8
/// (light tails) raises it by 0.5. Heavy-tailed baselines are deliberately
/// flagged harder.
fn dynamic_threshold(baseline: &[f64], std: f64) -> f64 {
    let ratio = stats::iqr(baseline) / std;
    if ratio > HEAVY_TAIL_RATIO {
        STATISTICAL_BASE_THRESHOLD - THRESHOLD_ADJUSTMENT
    } else if ratio < LIGHT_TAIL_RATIO {
        STATISTICAL_BASE_THRESHOLD + THRESHOLD_ADJUSTMENT
    } else {
        STATISTICAL_BASE_THRESHOLD
    }
}

/// Severity ladder, highest priority first.
fn classify(detail: &AnomalyDetail) -> Severity {
    match detail {
        AnomalyDetail::Vsm {
            violation: VarietyViolation::AlgedonicAlert,
            ..
        } => Severity::Critical,
        AnomalyDetail::Vsm {
            violation: VarietyViolation::RecursionBreakdown,
            ..
        } => Severity::High,
        AnomalyDetail::Statistical { z_score, .. } if z_score.abs() > Z_HIGH => Severity::High,
        AnomalyDetail::Isolation { score } if *score > ISOLATION_HIGH => Severity::High,
        AnomalyDetail::Lof { score } if *score > LOF_MEDIUM => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Human summary naming the flagged indices.
fn describe(method: DetectionMethod, data_points: usize, anomalies: &[ClassifiedAnomaly]) -> String {
    if anomalies.is_empty() {
        return format!("No anomalies detected in {data_points} data points ({method})");
    }

    let mut indices: Vec<String> = anomalies
        .iter()
        .take(DESCRIPTION_INDEX_CAP)
        .map(|a| a.index.to_string())
        .collect();
    if anomalies.len() > DESCRIPTION_INDEX_CAP {
        indices.push(format!("… {} more", anomalies.len() - DESCRIPTION_INDEX_CAP));
    }

    format!(
        "Detected {} anomalies in {} data points using {} detection (indices: {})",
        anomalies.len(),
        data_points,
        method,
        indices.join(", ")
    )
}

/// Operator recommendations derived from the violation mix and anomaly rate.
fn recommend(anomalies: &[ClassifiedAnomaly], data_points: usize) -> Vec<String> {
    let mut recommendations = Vec::new();
    if anomalies.is_empty() {
        return recommendations;
    }

    let mut push_once = |text: &str| {
        if !recommendations.iter().any(|r| r == text) {
            recommendations.push(text.to_string());
        }
    };

    for anomaly in anomalies {
        if let AnomalyDetail::Vsm { violation, .. } = &anomaly.detail {
            match violation {
                VarietyViolation::InsufficientVariety => {
                    push_once("Increase variety at the starved recursion levels");
                }
                VarietyViolation::ExcessiveVariety => {
                    push_once("Apply variety filters to attenuate environmental complexity");
                }
                VarietyViolation::RecursionBreakdown => {
                    push_once("Check recursion channels between control tiers");
                }
                VarietyViolation::AlgedonicAlert => {}
            }
        }
    }

    if anomalies.iter().any(|a| a.severity == Severity::Critical) {
        push_once("Activate algedonic response procedures");
    }

    if data_points > 0 {
        let rate = anomalies.len() as f64 / data_points as f64;
        if rate > BASELINE_REVIEW_RATE {
            push_once("Review baseline: anomaly rate exceeds 20% of the input");
        }
    }

    recommendations
}
