//! Correlation analysis records: matrix, relationships, causal network.

use serde::{Deserialize, Serialize};

/// Dense symmetric correlation matrix with unit diagonal.
///
/// Stored row-major; writes through [`CorrelationMatrix::set`] mirror the
/// symmetric entry so the symmetry invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    size: usize,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Identity-initialized n x n matrix (diagonal 1, off-diagonal 0).
    pub fn identity(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
        }
        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Entry (i, j). Out-of-range indices return 0.0.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.size || j >= self.size {
            return 0.0;
        }
        self.values[i * self.size + j]
    }

    /// Set (i, j) and (j, i). Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        if i >= self.size || j >= self.size {
            return;
        }
        self.values[i * self.size + j] = value;
        self.values[j * self.size + i] = value;
    }
}

/// Sign of a pairwise correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn of(correlation: f64) -> Self {
        if correlation < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

/// A pairwise relationship that met the correlation threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Index of the first pattern (always < `target`).
    pub source: usize,
    /// Index of the second pattern.
    pub target: usize,
    /// Blended correlation in [-1, 1].
    pub correlation: f64,
    /// |correlation|.
    pub strength: f64,
    pub direction: Direction,
    /// 1 minus the width of the Fisher 95% interval, clamped to [0, 1].
    pub confidence: f64,
    /// Two-tailed p-value from the Student's t distribution.
    pub p_value: f64,
    /// Aligned sample count the correlation was computed over.
    pub sample_count: usize,
}

/// Lag-sweep result from `find_optimal_lag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagProfile {
    /// Tested lags, ascending (negative = first series leads).
    pub lags: Vec<i64>,
    /// Correlation at each tested lag, same order as `lags`.
    pub correlations: Vec<f64>,
    /// Lag with the highest |correlation|.
    pub optimal_lag: i64,
    pub correlation_at_optimal: f64,
}

/// A directed causal edge accepted by the Granger screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalLink {
    pub source: usize,
    pub target: usize,
    /// F-statistic for source -> target.
    pub f_statistic: f64,
    /// F-statistic for the reverse direction.
    pub reverse_f_statistic: f64,
    /// Both directions passed the acceptance gate.
    pub bidirectional: bool,
    /// Lag with maximal |correlation| between the pair.
    pub optimal_lag: i64,
}

/// Directed causal graph stored by indices, not pointers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalGraph {
    /// Unique pattern indices that appear in any accepted link.
    pub nodes: Vec<usize>,
    /// (source, target) pairs; parallel edges are possible for bidirectional links.
    pub edges: Vec<(usize, usize)>,
}

/// Output of the opt-in causal screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalAnalysis {
    pub links: Vec<CausalLink>,
    pub graph: CausalGraph,
    /// Nodes with outgoing edges and no incoming edges.
    pub root_causes: Vec<usize>,
    /// Nodes with incoming edges and no outgoing edges.
    pub effects: Vec<usize>,
}

/// Aggregate metrics over the relationship network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub nodes: usize,
    pub edges: usize,
    /// edges / C(nodes, 2).
    pub density: f64,
    pub avg_correlation: f64,
    /// Global transitivity: 3 x triangles / connected triples.
    pub clustering_coefficient: f64,
    /// Newman modularity with connected components as communities.
    pub modularity: f64,
}

/// Full result of a correlation analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Opaque identifier (`corr_` prefix).
    pub id: String,
    /// Epoch milliseconds at analysis time.
    pub timestamp: i64,
    /// Number of input patterns.
    pub pattern_count: usize,
    pub matrix: CorrelationMatrix,
    /// Pairs with |r| at or above the threshold, i < j.
    pub relationships: Vec<Relationship>,
    /// Max-strength relationship, if any.
    pub strongest: Option<Relationship>,
    /// Present only when causal analysis was requested.
    pub causal: Option<CausalAnalysis>,
    pub network: NetworkMetrics,
}

impl CorrelationResult {
    /// True when at least one relationship met the threshold.
    pub fn is_significant(&self) -> bool {
        !self.relationships.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_symmetric_with_unit_diagonal() {
        let mut m = CorrelationMatrix::identity(4);
        m.set(0, 2, 0.8);
        m.set(1, 3, -0.4);

        for i in 0..4 {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..4 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert_eq!(m.get(2, 0), 0.8);
        assert_eq!(m.get(3, 1), -0.4);
    }

    #[test]
    fn matrix_out_of_range_is_inert() {
        let mut m = CorrelationMatrix::identity(2);
        m.set(5, 0, 0.9);
        assert_eq!(m.get(5, 0), 0.0);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn direction_from_sign() {
        assert_eq!(Direction::of(0.3), Direction::Positive);
        assert_eq!(Direction::of(-0.3), Direction::Negative);
        assert_eq!(Direction::of(0.0), Direction::Positive);
    }
}
