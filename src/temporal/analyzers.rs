//! Per-window pattern analyzers: periodicity, trend, burst, decay, cycles.
//!
//! Each analyzer is a pure function from a window slice to an optional
//! [`PatternKind`]. A record is only emitted when the analyzer's confidence
//! gate passes; degenerate windows (constant, too short) emit nothing.

use crate::stats;
use crate::types::{BurstEvent, CycleSpan, PatternKind, TrendDirection};

/// Autocorrelation peak must exceed this to be considered periodic at all.
const PERIODICITY_CANDIDATE_R: f64 = 0.5;

/// Minimum strength for a periodicity record to be emitted.
const PERIODICITY_MIN_STRENGTH: f64 = 0.7;

/// Slope magnitude below which a trend is classified flat.
const TREND_FLAT_SLOPE: f64 = 0.01;

/// Minimum r-squared for a trend record to be emitted.
const TREND_MIN_R_SQUARED: f64 = 0.8;

/// Burst threshold is mean + this many standard deviations.
const BURST_SIGMA: f64 = 2.0;

/// Maximum (negative) log-slope for a decay record.
const DECAY_MAX_SLOPE: f64 = -0.01;

/// Minimum r-squared of the log-linear fit for a decay record.
const DECAY_MIN_R_SQUARED: f64 = 0.85;

/// Minimum complete cycles for a cyclic record.
const CYCLIC_MIN_CYCLES: usize = 2;

/// Detect a dominant period from the autocorrelation profile.
///
/// Picks the first local maximum at lag >= 1 with r > 0.5 where
/// r(lag) > r(lag-1) and r(lag) > r(lag+1). The phase is the shift within
/// [-period/4, +period/4] that best aligns a reference sine of the same
/// period with the window; phase = 2π·shift/period.
pub fn detect_periodicity(window: &[f64]) -> Option<PatternKind> {
    let acf = stats::autocorrelation(window);
    if acf.len() < 3 {
        return None;
    }

    let mut candidate: Option<(usize, f64)> = None;
    for lag in 1..acf.len() - 1 {
        let r = acf[lag];
        if r > PERIODICITY_CANDIDATE_R && r > acf[lag - 1] && r > acf[lag + 1] {
            candidate = Some((lag, r));
            break;
        }
    }
    let (lag, strength) = candidate?;
    if strength <= PERIODICITY_MIN_STRENGTH {
        return None;
    }

    let period = lag as f64;
    let phase = best_phase(window, period);

    Some(PatternKind::Periodic {
        period,
        strength: strength.clamp(0.0, 1.0),
        frequency: 1.0 / period,
        phase,
    })
}

/// Sweep shifts in [-period/4, +period/4] for the best sine alignment.
fn best_phase(window: &[f64], period: f64) -> f64 {
    let quarter = (period / 4.0).floor() as i64;
    let mut best_shift = 0i64;
    let mut best_r = f64::NEG_INFINITY;

    for shift in -quarter..=quarter {
        let reference: Vec<f64> = (0..window.len())
            .map(|i| (2.0 * std::f64::consts::PI * (i as f64 + shift as f64) / period).sin())
            .collect();
        let r = stats::pearson(window, &reference);
        if r > best_r {
            best_r = r;
            best_shift = shift;
        }
    }

    2.0 * std::f64::consts::PI * best_shift as f64 / period
}

/// Classify a monotonic trend from an OLS fit over sample indices.
pub fn detect_trend(window: &[f64]) -> Option<PatternKind> {
    if window.len() < 3 {
        return None;
    }
    let x: Vec<f64> = (0..window.len()).map(|i| i as f64).collect();
    let fit = stats::linear_regression(&x, window);
    if fit.r_squared <= TREND_MIN_R_SQUARED {
        return None;
    }

    let direction = if fit.slope.abs() < TREND_FLAT_SLOPE {
        TrendDirection::Flat
    } else if fit.slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    Some(PatternKind::Trend {
        direction,
        slope: fit.slope,
        r_squared: fit.r_squared,
        rate: fit.slope.abs(),
    })
}

/// Flag excursions above mean + 2σ as burst events.
///
/// Total strength is the summed excess magnitude normalized by the summed
/// absolute signal, clamped to 1. Emits nothing when no value crosses the
/// threshold (a constant window never bursts since σ = 0).
pub fn detect_bursts(window: &[f64]) -> Option<PatternKind> {
    if window.is_empty() {
        return None;
    }
    let mean = stats::mean(window);
    let std = stats::std_dev(window);
    if std <= 0.0 {
        return None;
    }
    let threshold = mean + BURST_SIGMA * std;

    let events: Vec<BurstEvent> = window
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > threshold)
        .map(|(index, &v)| BurstEvent {
            index,
            magnitude: v - mean,
        })
        .collect();
    if events.is_empty() {
        return None;
    }

    let total_magnitude: f64 = events.iter().map(|e| e.magnitude).sum();
    let total_signal: f64 = window.iter().map(|v| v.abs()).sum();
    let strength = if total_signal > 0.0 {
        (total_magnitude / total_signal).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let count = events.len();
    let avg_magnitude = total_magnitude / count as f64;

    Some(PatternKind::Burst {
        events,
        strength,
        count,
        avg_magnitude,
    })
}

/// Detect exponential decay via a log-linear fit.
///
/// Non-positive values contribute a ln-substitute of 0.0 to the fit, which
/// biases windows that cross zero; such windows rarely pass the r² gate.
/// Requires slope < -0.01 and r² > 0.85.
pub fn detect_decay(window: &[f64]) -> Option<PatternKind> {
    if window.len() < 3 {
        return None;
    }
    let x: Vec<f64> = (0..window.len()).map(|i| i as f64).collect();
    let logs: Vec<f64> = window
        .iter()
        .map(|&v| if v > 0.0 { v.ln() } else { 0.0 })
        .collect();

    let fit = stats::linear_regression(&x, &logs);
    if fit.slope >= DECAY_MAX_SLOPE || fit.r_squared <= DECAY_MIN_R_SQUARED {
        return None;
    }

    let rate = -fit.slope;
    Some(PatternKind::Decay {
        rate,
        half_life: std::f64::consts::LN_2 / rate,
        r_squared: fit.r_squared,
        time_to_one_percent: 100.0_f64.ln() / rate,
    })
}

/// Detect repeating cycles from zero crossings of the mean-centered series.
///
/// A cycle spans consecutive crossings. Requires at least two complete
/// cycles; regularity is 1 / (1 + cv) of the cycle durations.
pub fn detect_cycles(window: &[f64]) -> Option<PatternKind> {
    if window.len() < 4 {
        return None;
    }
    let mean = stats::mean(window);
    let centered: Vec<f64> = window.iter().map(|v| v - mean).collect();

    let mut crossings = Vec::new();
    for i in 1..centered.len() {
        if centered[i - 1] * centered[i] < 0.0 {
            crossings.push(i);
        }
    }
    if crossings.len() < CYCLIC_MIN_CYCLES + 1 {
        return None;
    }

    let cycles: Vec<CycleSpan> = crossings
        .windows(2)
        .map(|pair| CycleSpan {
            start: pair[0],
            end: pair[1],
            duration: pair[1] - pair[0],
        })
        .collect();
    if cycles.len() < CYCLIC_MIN_CYCLES {
        return None;
    }

    let durations: Vec<f64> = cycles.iter().map(|c| c.duration as f64).collect();
    let mean_duration = stats::mean(&durations);
    if mean_duration <= 0.0 {
        return None;
    }
    let cv = stats::std_dev(&durations) / mean_duration;

    Some(PatternKind::Cyclic {
        cycles,
        strength: (1.0 / (1.0 + cv)).clamp(0.0, 1.0),
        variability: cv,
    })
}

/// Run all five analyzers over one window.
pub fn analyze_window(window: &[f64]) -> Vec<PatternKind> {
    [
        detect_periodicity(window),
        detect_trend(window),
        detect_bursts(window),
        detect_decay(window),
        detect_cycles(window),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period).sin())
            .collect()
    }

    #[test]
    fn periodicity_detects_sine_period() {
        let window = sine(100, 10.0);
        let pattern = detect_periodicity(&window).expect("sine should be periodic");
        match pattern {
            PatternKind::Periodic {
                period,
                strength,
                frequency,
                ..
            } => {
                assert!((period - 10.0).abs() <= 1.0, "period {period} not near 10");
                assert!(strength > 0.7);
                assert!((frequency - 1.0 / period).abs() < 1e-12);
            }
            other => panic!("expected periodic, got {other:?}"),
        }
    }

    #[test]
    fn periodicity_rejects_noise_and_constants() {
        let scrambled: Vec<f64> = (0..100).map(|i| ((i * 7919) % 100) as f64).collect();
        assert!(detect_periodicity(&scrambled).is_none());
        assert!(detect_periodicity(&vec![5.0; 100]).is_none());
    }

    #[test]
    fn trend_detects_increasing_line() {
        let window: Vec<f64> = (0..100).map(|i| 0.5 * i as f64 + 3.0).collect();
        let pattern = detect_trend(&window).expect("line should trend");
        match pattern {
            PatternKind::Trend {
                direction,
                slope,
                r_squared,
                rate,
            } => {
                assert_eq!(direction, TrendDirection::Increasing);
                assert!((slope - 0.5).abs() < 1e-9);
                assert!(r_squared > 0.99);
                assert!((rate - 0.5).abs() < 1e-9);
            }
            other => panic!("expected trend, got {other:?}"),
        }
    }

    #[test]
    fn trend_rejects_constant_window() {
        assert!(detect_trend(&vec![2.0; 100]).is_none());
    }

    #[test]
    fn trend_classifies_decreasing() {
        let window: Vec<f64> = (0..100).map(|i| 100.0 - 0.8 * i as f64).collect();
        match detect_trend(&window) {
            Some(PatternKind::Trend { direction, .. }) => {
                assert_eq!(direction, TrendDirection::Decreasing);
            }
            other => panic!("expected decreasing trend, got {other:?}"),
        }
    }

    #[test]
    fn bursts_flag_spikes_above_two_sigma() {
        let mut window = vec![10.0, 10.5, 9.5, 10.2, 9.8, 10.1, 9.9, 10.3, 9.7, 10.0];
        window[4] = 50.0;
        let pattern = detect_bursts(&window).expect("spike should burst");
        match pattern {
            PatternKind::Burst {
                events,
                count,
                strength,
                ..
            } => {
                assert_eq!(count, 1);
                assert_eq!(events[0].index, 4);
                assert!(events[0].magnitude > 30.0);
                assert!(strength > 0.0 && strength <= 1.0);
            }
            other => panic!("expected burst, got {other:?}"),
        }
    }

    #[test]
    fn bursts_absent_for_constant_window() {
        assert!(detect_bursts(&vec![7.0; 50]).is_none());
    }

    #[test]
    fn decay_detects_exponential() {
        let window: Vec<f64> = (0..100).map(|i| 100.0 * (-0.05 * i as f64).exp()).collect();
        let pattern = detect_decay(&window).expect("exponential should decay");
        match pattern {
            PatternKind::Decay {
                rate,
                half_life,
                r_squared,
                time_to_one_percent,
            } => {
                assert!((rate - 0.05).abs() < 1e-6);
                assert!((half_life - std::f64::consts::LN_2 / 0.05).abs() < 1e-3);
                assert!(r_squared > 0.99);
                assert!((time_to_one_percent - 100.0_f64.ln() / 0.05).abs() < 1e-3);
            }
            other => panic!("expected decay, got {other:?}"),
        }
    }

    #[test]
    fn decay_rejects_growth() {
        let window: Vec<f64> = (0..100).map(|i| (0.05 * i as f64).exp()).collect();
        assert!(detect_decay(&window).is_none());
    }

    #[test]
    fn cycles_detect_alternating_series() {
        let window = sine(100, 20.0);
        let pattern = detect_cycles(&window).expect("sine should cycle");
        match pattern {
            PatternKind::Cyclic {
                cycles,
                strength,
                variability,
            } => {
                assert!(cycles.len() >= 2);
                // Half-period cycles of a clean sine are near-uniform.
                assert!(strength > 0.8, "regularity {strength} too low");
                assert!(variability < 0.25);
            }
            other => panic!("expected cyclic, got {other:?}"),
        }
    }

    #[test]
    fn cycles_absent_for_monotonic_series() {
        let window: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert!(detect_cycles(&window).is_none());
    }

    #[test]
    fn analyze_window_empty_for_constants() {
        assert!(analyze_window(&vec![3.0; 100]).is_empty());
    }
}
