//! Local outlier factor over a scalar baseline.
//!
//! Compares the local reachability density of a query value against the
//! densities of its k nearest baseline points. LOF near 1 means the value
//! sits in a region as dense as its neighbors; values well above 1 are
//! local outliers.

/// Distance-sum floor avoiding division blowups when a value coincides
/// with baseline points.
const DISTANCE_FLOOR: f64 = 1e-10;

/// Score reported when the query's own density degenerates to zero.
const DEGENERATE_SCORE: f64 = 2.0;

/// Neighborhood size: min(20, n/10), at least 1.
pub fn neighborhood_size(baseline_len: usize) -> usize {
    (baseline_len / 10).min(20).max(1)
}

/// The k smallest distances from `value` to the baseline, ascending.
fn k_nearest_distances(value: f64, baseline: &[f64], k: usize) -> Vec<f64> {
    let mut distances: Vec<f64> = baseline.iter().map(|b| (value - b).abs()).collect();
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distances.truncate(k);
    distances
}

/// Indices of the k nearest baseline points to `value`.
fn k_nearest_indices(value: f64, baseline: &[f64], k: usize) -> Vec<usize> {
    let mut indexed: Vec<(usize, f64)> = baseline
        .iter()
        .enumerate()
        .map(|(i, b)| (i, (value - b).abs()))
        .collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.into_iter().take(k).map(|(i, _)| i).collect()
}

/// Local reachability density: k over the summed reach distances, where a
/// reach distance is max(distance, k-th distance).
fn local_reachability_density(value: f64, baseline: &[f64], k: usize) -> f64 {
    let distances = k_nearest_distances(value, baseline, k);
    if distances.is_empty() {
        return 0.0;
    }
    let k_distance = distances[distances.len() - 1];
    let reach_sum: f64 = distances.iter().map(|d| d.max(k_distance)).sum();
    k as f64 / reach_sum.max(DISTANCE_FLOOR)
}

/// LOF of `value` against the baseline.
///
/// Mean neighbor density over the query's own density. A degenerate query
/// density scores 2.0.
pub fn lof_score(value: f64, baseline: &[f64], k: usize) -> f64 {
    if baseline.is_empty() || k == 0 {
        return 0.0;
    }

    let own_density = local_reachability_density(value, baseline, k);
    if own_density <= 0.0 {
        return DEGENERATE_SCORE;
    }

    let neighbors = k_nearest_indices(value, baseline, k);
    let neighbor_density_sum: f64 = neighbors
        .iter()
        .map(|&i| local_reachability_density(baseline[i], baseline, k))
        .sum();
    let mean_neighbor_density = neighbor_density_sum / neighbors.len() as f64;

    mean_neighbor_density / own_density
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_baseline() -> Vec<f64> {
        (0..200).map(|i| 10.0 + ((i % 11) as f64 - 5.0) * 0.05).collect()
    }

    #[test]
    fn neighborhood_size_bounds() {
        assert_eq!(neighborhood_size(5), 1);
        assert_eq!(neighborhood_size(100), 10);
        assert_eq!(neighborhood_size(1000), 20);
        assert_eq!(neighborhood_size(10_000), 20);
    }

    #[test]
    fn inlier_scores_near_one() {
        let baseline = dense_baseline();
        let k = neighborhood_size(baseline.len());
        let score = lof_score(10.0, &baseline, k);
        assert!(
            score < 1.5,
            "cluster-center LOF {score} should stay below the flag gate"
        );
    }

    #[test]
    fn distant_outlier_scores_high() {
        let baseline = dense_baseline();
        let k = neighborhood_size(baseline.len());
        let score = lof_score(100.0, &baseline, k);
        assert!(score > 1.5, "distant outlier LOF {score} should flag");
    }

    #[test]
    fn lof_is_nonnegative() {
        let baseline = dense_baseline();
        let k = neighborhood_size(baseline.len());
        for value in [-50.0, 0.0, 9.9, 10.1, 500.0] {
            let score = lof_score(value, &baseline, k);
            assert!(score >= 0.0, "LOF {score} must be nonnegative");
        }
    }

    #[test]
    fn identical_baseline_does_not_blow_up() {
        let baseline = vec![5.0; 100];
        let k = neighborhood_size(baseline.len());
        let score = lof_score(5.0, &baseline, k);
        assert!(score.is_finite());
        // Same density everywhere: the value is not a local outlier.
        assert!((score - 1.0).abs() < 1e-6, "uniform LOF {score} should be 1");
    }

    #[test]
    fn empty_baseline_scores_zero() {
        assert_eq!(lof_score(1.0, &[], 5), 0.0);
        assert_eq!(lof_score(1.0, &[1.0, 2.0], 0), 0.0);
    }
}
