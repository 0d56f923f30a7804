//! Feature encoding for vector-store documents.
//!
//! Records are flattened to raw feature vectors, folded into a fixed
//! dimensionality by modulo feature hashing, and L2-normalized. The encoder
//! is a pluggable seam: deployments with a learned embedding model implement
//! [`FeatureEncoder`] over the same contract.

use crate::types::{AnomalyResult, CorrelationResult, TemporalPatterns};

/// Pluggable feature-vector encoder.
pub trait FeatureEncoder: Send + Sync {
    /// Encode raw features into a fixed-dimension, L2-normalized vector.
    fn encode(&self, features: &[f64]) -> Vec<f64>;

    /// Output dimensionality.
    fn dimensions(&self) -> usize;
}

/// Default encoder: modulo feature hashing into D buckets + L2 norm.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimensions: usize,
}

impl HashingEncoder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl FeatureEncoder for HashingEncoder {
    fn encode(&self, features: &[f64]) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimensions];
        for (i, &feature) in features.iter().enumerate() {
            // Over-long feature vectors fold into D buckets.
            vector[i % self.dimensions] += feature;
        }

        let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Raw features for a temporal pattern record: shape counts, confidence,
/// and per-kind summary statistics.
pub fn pattern_features(result: &TemporalPatterns) -> Vec<f64> {
    let mut features = vec![
        result.data_points as f64,
        result.patterns.len() as f64,
        result.confidence,
    ];
    // Stable order: summaries sorted by kind name.
    let mut kinds: Vec<_> = result.summary.iter().collect();
    kinds.sort_by(|a, b| a.0.cmp(b.0));
    for (_, summary) in kinds {
        features.push(summary.count as f64);
        features.push(summary.avg_strength);
        features.push(summary.max_strength);
    }
    for detected in &result.patterns {
        features.push(detected.window_start as f64);
        features.push(detected.pattern.strength());
    }
    features
}

/// Raw features for an anomaly record: counts, severity rank, indices and
/// values of the flagged points.
pub fn anomaly_features(result: &AnomalyResult) -> Vec<f64> {
    let mut features = vec![
        result.data_points as f64,
        result.anomaly_count as f64,
        result.severity as u8 as f64,
        if result.critical { 1.0 } else { 0.0 },
    ];
    for anomaly in &result.anomalies {
        features.push(anomaly.index as f64);
        features.push(anomaly.value);
    }
    features
}

/// Raw features for a correlation record: the flattened upper triangle plus
/// network metrics.
pub fn correlation_features(result: &CorrelationResult) -> Vec<f64> {
    let n = result.matrix.size();
    let mut features = vec![
        n as f64,
        result.relationships.len() as f64,
        result.network.density,
        result.network.avg_correlation,
    ];
    for i in 0..n {
        for j in (i + 1)..n {
            features.push(result.matrix.get(i, j));
        }
    }
    features
}
