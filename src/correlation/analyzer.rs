//! Multi-method pairwise correlation with statistical significance.
//!
//! Off-diagonal matrix entries blend Pearson, Spearman, Kendall, and
//! normalized mutual information under fixed per-method weights. Retained
//! relationships carry a Fisher-interval confidence and a Student's t
//! p-value (two-tailed), so downstream consumers can filter on either.

use statrs::distribution::{ContinuousCDF, StudentsT};
use std::borrow::Cow;
use tracing::debug;

use super::causal;
use crate::config;
use crate::stats;
use crate::types::{
    ids, CorrelationMatrix, CorrelationResult, Direction, LagProfile, NetworkMetrics, Relationship,
};

/// Anything exposing a numeric sequence for correlation.
///
/// Implemented for plain slices/vectors and for indexed time series; pattern
/// sources with richer shapes implement this at their boundary.
pub trait AsSeries {
    fn as_series(&self) -> Cow<'_, [f64]>;
}

impl AsSeries for Vec<f64> {
    fn as_series(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self)
    }
}

impl AsSeries for &[f64] {
    fn as_series(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self)
    }
}

/// A (timestamp, value) series; only the values participate in correlation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexedSeries {
    pub points: Vec<(i64, f64)>,
}

impl AsSeries for IndexedSeries {
    fn as_series(&self) -> Cow<'_, [f64]> {
        Cow::Owned(self.points.iter().map(|(_, v)| *v).collect())
    }
}

/// Correlation method selector with its blend weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
    Kendall,
    MutualInformation,
}

impl CorrelationMethod {
    /// All four methods, the default selection.
    pub const ALL: [Self; 4] = [
        Self::Pearson,
        Self::Spearman,
        Self::Kendall,
        Self::MutualInformation,
    ];

    /// Fixed blend weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Pearson => 1.0,
            Self::Spearman => 0.9,
            Self::Kendall => 0.8,
            Self::MutualInformation => 1.1,
        }
    }

    fn compute(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Pearson => stats::pearson(a, b),
            Self::Spearman => stats::spearman(a, b),
            Self::Kendall => stats::kendall(a, b),
            Self::MutualInformation => stats::mutual_information(a, b, true),
        }
    }
}

/// Weighted multi-method correlation over the aligned common prefix.
pub fn multi_method_correlation(a: &[f64], b: &[f64], methods: &[CorrelationMethod]) -> f64 {
    if methods.is_empty() {
        return 0.0;
    }
    let n = a.len().min(b.len());
    let a = &a[..n];
    let b = &b[..n];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for method in methods {
        weighted_sum += method.compute(a, b) * method.weight();
        weight_total += method.weight();
    }
    weighted_sum / weight_total
}

/// Pairwise correlation analyzer.
///
/// Stateless apart from its options; safe to share across callers.
#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    threshold: f64,
    methods: Vec<CorrelationMethod>,
    analyze_causality: bool,
}

impl CorrelationAnalyzer {
    /// Analyzer with the configured threshold, all methods, causality off.
    pub fn new() -> Self {
        Self {
            threshold: config::get().detection.correlation_threshold,
            methods: CorrelationMethod::ALL.to_vec(),
            analyze_causality: false,
        }
    }

    /// Explicit relationship threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Restrict the method blend.
    pub fn with_methods(mut self, methods: Vec<CorrelationMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Enable the Granger-style causal screen.
    pub fn with_causality(mut self, enabled: bool) -> Self {
        self.analyze_causality = enabled;
        self
    }

    /// Score every pair, extract relationships, and synthesize the network.
    pub fn analyze<S: AsSeries>(&self, inputs: &[S]) -> CorrelationResult {
        let series: Vec<Cow<'_, [f64]>> = inputs.iter().map(AsSeries::as_series).collect();
        let n = series.len();

        let mut matrix = CorrelationMatrix::identity(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let r = multi_method_correlation(&series[i], &series[j], &self.methods);
                matrix.set(i, j, r);
            }
        }

        let mut relationships = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let r = matrix.get(i, j);
                if r.abs() < self.threshold {
                    continue;
                }
                let sample_count = series[i].len().min(series[j].len());
                relationships.push(Relationship {
                    source: i,
                    target: j,
                    correlation: r,
                    strength: r.abs(),
                    direction: Direction::of(r),
                    confidence: fisher_confidence(r, sample_count),
                    p_value: p_value_for_r(r, sample_count),
                    sample_count,
                });
            }
        }

        let strongest = relationships
            .iter()
            .max_by(|a, b| {
                a.strength
                    .partial_cmp(&b.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();

        let causal = if self.analyze_causality {
            Some(causal::analyze(&series, &relationships))
        } else {
            None
        };

        let network = network_metrics(n, &relationships);

        debug!(
            patterns = n,
            relationships = relationships.len(),
            causal = self.analyze_causality,
            density = network.density,
            "Correlation analysis complete"
        );

        CorrelationResult {
            id: ids::correlation_id(),
            timestamp: ids::now_millis(),
            pattern_count: n,
            matrix,
            relationships,
            strongest,
            causal,
            network,
        }
    }

    /// Sweep lags in [-L, +L], L = min(|a|, |b|) / 4, and report the lag
    /// maximizing |r|. Positive lag means the first series leads.
    pub fn find_optimal_lag(&self, a: &[f64], b: &[f64]) -> LagProfile {
        let n = a.len().min(b.len());
        let max_lag = (n / 4) as i64;

        let mut lags = Vec::new();
        let mut correlations = Vec::new();
        let mut optimal_lag = 0i64;
        let mut best_r = 0.0f64;

        for lag in -max_lag..=max_lag {
            let r = lagged_correlation(a, b, lag, &self.methods);
            lags.push(lag);
            correlations.push(r);
            if r.abs() > best_r.abs() {
                best_r = r;
                optimal_lag = lag;
            }
        }

        LagProfile {
            lags,
            correlations,
            optimal_lag,
            correlation_at_optimal: best_r,
        }
    }
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Correlation of `a` against `b` shifted by `lag` samples.
///
/// Positive lag aligns a[t] with b[t + lag] (the first series leads).
pub(crate) fn lagged_correlation(
    a: &[f64],
    b: &[f64],
    lag: i64,
    methods: &[CorrelationMethod],
) -> f64 {
    let n = a.len().min(b.len());
    let shift = lag.unsigned_abs() as usize;
    if shift >= n {
        return 0.0;
    }
    if lag >= 0 {
        multi_method_correlation(&a[..n - shift], &b[shift..n], methods)
    } else {
        multi_method_correlation(&a[shift..n], &b[..n - shift], methods)
    }
}

/// Confidence from the Fisher-transformation 95% interval width.
///
/// z = atanh(r), se = 1/sqrt(n-3); confidence = 1 - min(upper - lower, 1).
/// Fewer than four samples cannot support an interval and score 0.
fn fisher_confidence(r: f64, n: usize) -> f64 {
    if n <= 3 {
        return 0.0;
    }
    // atanh is undefined at |r| = 1; nudge inside the open interval.
    let clamped = r.clamp(-0.999_999, 0.999_999);
    let z = clamped.atanh();
    let se = 1.0 / ((n - 3) as f64).sqrt();
    let lower = (z - 1.96 * se).tanh();
    let upper = (z + 1.96 * se).tanh();
    (1.0 - (upper - lower).min(1.0)).clamp(0.0, 1.0)
}

/// Two-tailed p-value for a correlation coefficient.
///
/// t = r * sqrt(n-2) / sqrt(1-r²) against Student's t with n-2 degrees of
/// freedom.
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}

/// Aggregate metrics over the relationship network.
///
/// Clustering coefficient is global transitivity (3 x triangles over
/// connected triples); modularity is Newman Q with connected components as
/// the community partition.
fn network_metrics(pattern_count: usize, relationships: &[Relationship]) -> NetworkMetrics {
    let mut node_set = std::collections::BTreeSet::new();
    for rel in relationships {
        node_set.insert(rel.source);
        node_set.insert(rel.target);
    }
    let nodes = node_set.len();
    let edges = relationships.len();

    let possible_pairs = if nodes >= 2 {
        (nodes * (nodes - 1)) / 2
    } else {
        0
    };
    let density = if possible_pairs > 0 {
        edges as f64 / possible_pairs as f64
    } else {
        0.0
    };

    let correlations: Vec<f64> = relationships.iter().map(|r| r.correlation).collect();
    let avg_correlation = stats::mean(&correlations);

    let (clustering_coefficient, modularity) =
        causal::graph_statistics(pattern_count, relationships);

    NetworkMetrics {
        nodes,
        edges,
        density,
        avg_correlation,
        clustering_coefficient,
        modularity,
    }
}
