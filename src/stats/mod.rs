//! Numeric Primitives - Descriptive Statistics & Correlation Measures
//!
//! Pure functions over finite-length `f64` slices. Every function here is
//! deterministic and total: degenerate inputs (empty slices, zero variance,
//! uniform series) return identity values (0.0) instead of erroring, so the
//! analysis pipeline never aborts on bad data.
//!
//! ## Provided
//!
//! - Mean, population variance/std, IQR
//! - Ascending ranks, Pearson, Spearman, Kendall
//! - Histogram mutual information (10 bins)
//! - Ordinary least squares regression
//! - Autocorrelation profile (lags 0..n/2)
//! - `RunningStats`: Welford online accumulator for baseline statistics

use serde::{Deserialize, Serialize};

/// Number of histogram bins used for mutual information.
const MI_BINS: usize = 10;

/// Minimum samples for a meaningful mutual information estimate.
const MI_MIN_SAMPLES: usize = 10;

/// Denominator floor guarding division in correlation measures.
const EPSILON: f64 = 1e-10;

// ============================================================================
// Descriptive Statistics
// ============================================================================

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n, not n-1). Returns 0.0 when n < 2.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Interquartile range on a sorted view.
///
/// Quartile positions are `n/4` and `3n/4` (integer division, no
/// interpolation). Returns 0.0 when n < 4.
pub fn iqr(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = sorted[sorted.len() / 4];
    let q3 = sorted[3 * sorted.len() / 4];
    q3 - q1
}

/// First and third quartiles on a sorted view (same positions as [`iqr`]).
///
/// Returns (0.0, 0.0) when n < 4.
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    if values.len() < 4 {
        return (0.0, 0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (sorted[sorted.len() / 4], sorted[3 * sorted.len() / 4])
}

/// Ascending ranks 1..=n.
///
/// Ties receive distinct ranks in input order — midranks are NOT averaged,
/// so Spearman on heavily tied data will be slightly off. Known limitation.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = vec![0.0; values.len()];
    for (rank, (original_index, _)) in indexed.into_iter().enumerate() {
        out[original_index] = (rank + 1) as f64;
    }
    out
}

// ============================================================================
// Correlation Measures
// ============================================================================

/// Pearson correlation coefficient.
///
/// Inputs are aligned to the shorter length. Returns 0.0 when fewer than
/// two aligned samples remain or either series has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let a = &a[..n];
    let b = &b[..n];

    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut num = 0.0;
    let mut den_a = 0.0;
    let mut den_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }

    let denom = (den_a * den_b).sqrt();
    if denom < EPSILON {
        0.0
    } else {
        num / denom
    }
}

/// Spearman rank correlation: Pearson over ascending ranks.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    pearson(&ranks(&a[..n]), &ranks(&b[..n]))
}

/// Kendall concordance coefficient over all pairs i < j.
///
/// A tie in either dimension counts as discordant (deliberately NOT the
/// tau-b definition, which excludes tied pairs from the denominator).
pub fn kendall(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let da = a[j] - a[i];
            let db = b[j] - b[i];
            if da * db > 0.0 {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let total = concordant + discordant;
    if total == 0 {
        0.0
    } else {
        (concordant - discordant) as f64 / total as f64
    }
}

/// Histogram mutual information MI(A;B) = H(A) + H(B) - H(A,B), in nats.
///
/// Uses a fixed 10x10 joint histogram. When `normalized` is set the result
/// is divided by min(H(A), H(B)) and clamped to [0, 1]. Returns 0.0 when
/// fewer than 10 aligned samples remain or either series is constant (zero
/// bin width).
pub fn mutual_information(a: &[f64], b: &[f64], normalized: bool) -> f64 {
    let n = a.len().min(b.len());
    if n < MI_MIN_SAMPLES {
        return 0.0;
    }
    let a = &a[..n];
    let b = &b[..n];

    let Some(bins_a) = bin_indices(a) else {
        return 0.0;
    };
    let Some(bins_b) = bin_indices(b) else {
        return 0.0;
    };

    let mut hist_a = [0usize; MI_BINS];
    let mut hist_b = [0usize; MI_BINS];
    let mut joint = [[0usize; MI_BINS]; MI_BINS];
    for i in 0..n {
        hist_a[bins_a[i]] += 1;
        hist_b[bins_b[i]] += 1;
        joint[bins_a[i]][bins_b[i]] += 1;
    }

    let h_a = histogram_entropy(&hist_a, n);
    let h_b = histogram_entropy(&hist_b, n);
    let h_ab = joint_entropy(&joint, n);

    let mi = (h_a + h_b - h_ab).max(0.0);
    if !normalized {
        return mi;
    }

    let max_mi = h_a.min(h_b);
    if max_mi < EPSILON {
        0.0
    } else {
        (mi / max_mi).clamp(0.0, 1.0)
    }
}

/// Map each value to its histogram bin. None when the value range is zero.
fn bin_indices(values: &[f64]) -> Option<Vec<usize>> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / MI_BINS as f64;
    if width <= 0.0 {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| (((v - min) / width) as usize).min(MI_BINS - 1))
            .collect(),
    )
}

fn histogram_entropy(hist: &[usize; MI_BINS], n: usize) -> f64 {
    hist.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n as f64;
            -p * p.ln()
        })
        .sum()
}

fn joint_entropy(joint: &[[usize; MI_BINS]; MI_BINS], n: usize) -> f64 {
    joint
        .iter()
        .flatten()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n as f64;
            -p * p.ln()
        })
        .sum()
}

// ============================================================================
// Regression & Autocorrelation
// ============================================================================

/// Ordinary least squares fit y = slope * x + intercept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in [0, 1].
    pub r_squared: f64,
}

impl Regression {
    const ZERO: Self = Self {
        slope: 0.0,
        intercept: 0.0,
        r_squared: 0.0,
    };
}

/// Ordinary least squares linear regression.
///
/// Inputs are aligned to the shorter length. Degenerate inputs (n < 2 or
/// zero x-variance) return the zero fit.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let n = x.len().min(y.len());
    if n < 2 {
        return Regression::ZERO;
    }
    let x = &x[..n];
    let y = &y[..n];

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        ss_xy += dx * (y[i] - mean_y);
        ss_xx += dx * dx;
    }
    if ss_xx < EPSILON {
        return Regression::ZERO;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for i in 0..n {
        let predicted = slope * x[i] + intercept;
        ss_res += (y[i] - predicted).powi(2);
        ss_tot += (y[i] - mean_y).powi(2);
    }
    let r_squared = if ss_tot < EPSILON {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Regression {
        slope,
        intercept,
        r_squared,
    }
}

/// Autocorrelation profile for lags 0..=n/2.
///
/// Each lag k is the Pearson correlation of the series against itself
/// shifted by k. Lag 0 is 1.0 for any series with nonzero variance.
pub fn autocorrelation(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }
    let max_lag = n / 2;
    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                if std_dev(values) < EPSILON {
                    0.0
                } else {
                    1.0
                }
            } else {
                pearson(&values[..n - lag], &values[lag..])
            }
        })
        .collect()
}

// ============================================================================
// Running Statistics (Welford)
// ============================================================================

/// Online mean/variance accumulator using Welford's algorithm.
///
/// Numerically stable for long-running baselines; used by the VSM anomaly
/// detector to summarize baseline variety.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    /// Fold an entire slice into a fresh accumulator.
    pub fn from_values(values: &[f64]) -> Self {
        let mut stats = Self::new();
        for &v in values {
            stats.push(v);
        }
        stats
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Population variance, consistent with [`variance`].
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn mean_and_variance_basics() {
        let xs = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&xs) - 5.0).abs() < 1e-12);
        // Population variance of the classic example is exactly 4.
        assert!((variance(&xs) - 4.0).abs() < 1e-12);
        assert!((std_dev(&xs) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_return_identity() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(iqr(&[]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
        assert!(autocorrelation(&[]).is_empty());
    }

    #[test]
    fn iqr_uses_floor_quartile_positions() {
        let xs = ramp(8); // sorted 0..7, q1 = xs[2] = 2, q3 = xs[6] = 6
        assert!((iqr(&xs) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn ranks_are_ascending_one_based() {
        let xs = vec![30.0, 10.0, 20.0];
        assert_eq!(ranks(&xs), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn ranks_ties_keep_input_order() {
        let xs = vec![5.0, 5.0, 1.0];
        // Stable sort: first 5.0 ranks before the second.
        assert_eq!(ranks(&xs), vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn pearson_self_is_one() {
        let xs = ramp(50);
        assert!((pearson(&xs, &xs) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_negated_is_minus_one() {
        let xs = ramp(50);
        let neg: Vec<f64> = xs.iter().map(|v| -v).collect();
        assert!((pearson(&xs, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_constant_series_is_zero() {
        let xs = vec![3.0; 20];
        let ys = ramp(20);
        assert_eq!(pearson(&xs, &ys), 0.0);
    }

    #[test]
    fn pearson_aligns_to_min_length() {
        let a = ramp(100);
        let b = ramp(40);
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spearman_invariant_under_monotonic_transform() {
        let xs = ramp(30);
        let cubed: Vec<f64> = xs.iter().map(|v| v.powi(3)).collect();
        let exp: Vec<f64> = xs.iter().map(|v| (v * 0.1).exp()).collect();
        assert!((spearman(&cubed, &xs) - 1.0).abs() < 1e-9);
        assert!((spearman(&exp, &xs) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kendall_perfect_orderings() {
        let xs = ramp(20);
        let rev: Vec<f64> = xs.iter().rev().copied().collect();
        assert!((kendall(&xs, &xs) - 1.0).abs() < 1e-9);
        assert!((kendall(&xs, &rev) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn kendall_ties_count_as_discordant() {
        // Constant second series: every pair is tied, so tau is -1.
        let xs = ramp(10);
        let flat = vec![1.0; 10];
        assert!((kendall(&xs, &flat) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn mutual_information_dependent_beats_independent() {
        let xs = ramp(200);
        let dependent: Vec<f64> = xs.iter().map(|v| v * 2.0 + 1.0).collect();
        // Deterministic pseudo-noise, decorrelated from the ramp.
        let scrambled: Vec<f64> = (0..200).map(|i| ((i * 7919) % 200) as f64).collect();

        let mi_dep = mutual_information(&xs, &dependent, true);
        let mi_ind = mutual_information(&xs, &scrambled, true);
        assert!(
            mi_dep > mi_ind,
            "dependent MI {mi_dep} should exceed scrambled MI {mi_ind}"
        );
        assert!(mi_dep <= 1.0 && mi_dep >= 0.0);
    }

    #[test]
    fn mutual_information_degenerate_inputs() {
        assert_eq!(mutual_information(&ramp(5), &ramp(5), true), 0.0);
        assert_eq!(mutual_information(&vec![1.0; 50], &ramp(50), true), 0.0);
    }

    #[test]
    fn regression_recovers_line() {
        let xs = ramp(50);
        let ys: Vec<f64> = xs.iter().map(|v| 3.0 * v - 7.0).collect();
        let fit = linear_regression(&xs, &ys);
        assert!((fit.slope - 3.0).abs() < 1e-9);
        assert!((fit.intercept + 7.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn regression_zero_x_variance() {
        let fit = linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]);
        assert_eq!(fit, Regression::ZERO);
    }

    #[test]
    fn autocorrelation_period_shows_at_lag() {
        let n = 100;
        let period = 10.0;
        let xs: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period).sin())
            .collect();
        let acf = autocorrelation(&xs);
        assert_eq!(acf.len(), n / 2 + 1);
        assert!((acf[0] - 1.0).abs() < 1e-9);
        assert!(acf[10] > 0.9, "lag-10 autocorrelation {} should be high", acf[10]);
        assert!(acf[5] < 0.0, "half-period lag should anticorrelate");
    }

    #[test]
    fn running_stats_matches_batch() {
        let xs = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = RunningStats::from_values(&xs);
        assert!((stats.mean() - mean(&xs)).abs() < 1e-12);
        assert!((stats.variance() - variance(&xs)).abs() < 1e-12);
        assert_eq!(stats.count(), xs.len());
        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 9.0);
    }
}
