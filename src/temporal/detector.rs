//! Temporal Detector - windowed pattern discrimination over a full series.
//!
//! Runs all five analyzers on every sliding window, concatenates the
//! detections, summarizes them by kind, and scores overall confidence.
//! Detection is deterministic: the same input always yields the same
//! patterns (identifiers aside).

use std::collections::HashMap;
use tracing::debug;

use super::analyzers::analyze_window;
use super::window::SlidingWindows;
use crate::config;
use crate::types::{ids, DetectedPattern, PatternTypeSummary, TemporalPatterns};

/// Consistency score assigned to a pattern kind observed exactly once.
const SINGLETON_CONSISTENCY: f64 = 0.5;

/// Windowed temporal pattern detector.
///
/// Stateless; a single instance may be shared across concurrent callers.
#[derive(Debug, Clone, Copy)]
pub struct TemporalDetector {
    window_size: usize,
    slide_interval: usize,
}

impl TemporalDetector {
    /// Detector using the globally configured windowing.
    pub fn new() -> Self {
        let windowing = &config::get().windowing;
        Self::with_windowing(windowing.window_size, windowing.slide_interval)
    }

    /// Detector with explicit windowing, for tests and embedded use.
    pub fn with_windowing(window_size: usize, slide_interval: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            slide_interval: slide_interval.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn slide_interval(&self) -> usize {
        self.slide_interval
    }

    /// Analyze a full series: one pass of all five analyzers per window.
    ///
    /// Inputs shorter than one window produce an empty result with
    /// confidence 0 — never an error.
    pub fn analyze(&self, data: &[f64]) -> TemporalPatterns {
        let mut patterns = Vec::new();
        for (start, window) in SlidingWindows::new(data, self.window_size, self.slide_interval) {
            for pattern in analyze_window(window) {
                patterns.push(DetectedPattern {
                    window_start: start,
                    pattern,
                });
            }
        }

        let summary = summarize(&patterns);
        let dominant = patterns
            .iter()
            .max_by(|a, b| {
                a.pattern
                    .strength()
                    .partial_cmp(&b.pattern.strength())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
        let confidence = confidence(&patterns, &summary);

        debug!(
            data_points = data.len(),
            patterns = patterns.len(),
            kinds = summary.len(),
            confidence = confidence,
            "Temporal analysis complete"
        );

        TemporalPatterns {
            id: ids::pattern_id(),
            timestamp: ids::now_millis(),
            data_points: data.len(),
            patterns,
            summary,
            dominant,
            confidence,
        }
    }

    /// Analyze one already-extracted window (streaming path).
    pub fn analyze_single_window(&self, window: &[f64], window_start: usize) -> TemporalPatterns {
        let patterns: Vec<DetectedPattern> = analyze_window(window)
            .into_iter()
            .map(|pattern| DetectedPattern {
                window_start,
                pattern,
            })
            .collect();

        let summary = summarize(&patterns);
        let dominant = patterns
            .iter()
            .max_by(|a, b| {
                a.pattern
                    .strength()
                    .partial_cmp(&b.pattern.strength())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
        let confidence = confidence(&patterns, &summary);

        TemporalPatterns {
            id: ids::pattern_id(),
            timestamp: ids::now_millis(),
            data_points: window.len(),
            patterns,
            summary,
            dominant,
            confidence,
        }
    }
}

impl Default for TemporalDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Group detections by kind with count, average and max strength.
fn summarize(patterns: &[DetectedPattern]) -> HashMap<String, PatternTypeSummary> {
    let mut grouped: HashMap<&'static str, Vec<f64>> = HashMap::new();
    for detected in patterns {
        grouped
            .entry(detected.pattern.kind_name())
            .or_default()
            .push(detected.pattern.strength());
    }

    grouped
        .into_iter()
        .map(|(kind, strengths)| {
            let count = strengths.len();
            let avg_strength = crate::stats::mean(&strengths);
            let max_strength = strengths.iter().copied().fold(f64::MIN, f64::max);
            (
                kind.to_string(),
                PatternTypeSummary {
                    count,
                    avg_strength,
                    max_strength,
                },
            )
        })
        .collect()
}

/// Overall confidence: (mean strength + cross-window consistency) / 2.
///
/// Consistency per kind is 1 - var/mean of that kind's strengths (0.5 for a
/// kind seen once); the final score is clamped to [0, 1]. No patterns means
/// confidence 0.
fn confidence(patterns: &[DetectedPattern], summary: &HashMap<String, PatternTypeSummary>) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }

    let strengths: Vec<f64> = patterns.iter().map(|d| d.pattern.strength()).collect();
    let mean_strength = crate::stats::mean(&strengths);

    let mut per_kind = Vec::with_capacity(summary.len());
    for kind in summary.keys() {
        let kind_strengths: Vec<f64> = patterns
            .iter()
            .filter(|d| d.pattern.kind_name() == kind.as_str())
            .map(|d| d.pattern.strength())
            .collect();
        if kind_strengths.len() < 2 {
            per_kind.push(SINGLETON_CONSISTENCY);
            continue;
        }
        let m = crate::stats::mean(&kind_strengths);
        let v = crate::stats::variance(&kind_strengths);
        let score = if m > 0.0 { 1.0 - v / m } else { 0.0 };
        per_kind.push(score.clamp(0.0, 1.0));
    }
    let consistency = crate::stats::mean(&per_kind);

    ((mean_strength + consistency) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternKind;

    fn sine_with_drift(n: usize, period: f64, drift: f64) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period).sin() + drift * i as f64)
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let detector = TemporalDetector::with_windowing(100, 10);
        let result = detector.analyze(&[]);
        assert!(result.patterns.is_empty());
        assert!(result.summary.is_empty());
        assert!(result.dominant.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.data_points, 0);
    }

    #[test]
    fn sine_input_dominant_is_periodic() {
        let detector = TemporalDetector::with_windowing(100, 10);
        let data = sine_with_drift(100, 10.0, 0.0);
        let result = detector.analyze(&data);

        assert!(!result.patterns.is_empty());
        let dominant = result.dominant.expect("sine should have a dominant pattern");
        assert!(
            matches!(dominant.pattern, PatternKind::Periodic { .. })
                || matches!(dominant.pattern, PatternKind::Cyclic { .. }),
            "dominant should be periodic-family, got {:?}",
            dominant.pattern
        );
        assert!(result.summary.contains_key("periodic"));
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[test]
    fn deterministic_across_runs() {
        let detector = TemporalDetector::with_windowing(100, 10);
        let data = sine_with_drift(200, 10.0, 0.01);
        let a = detector.analyze(&data);
        let b = detector.analyze(&data);
        assert_eq!(a.patterns, b.patterns);
        assert!((a.confidence - b.confidence).abs() < 1e-15);
        assert_ne!(a.id, b.id, "identifiers are freshly minted per run");
    }

    #[test]
    fn multi_window_concatenates_patterns() {
        let detector = TemporalDetector::with_windowing(100, 50);
        // 200 samples -> windows at 0, 50, 100.
        let data: Vec<f64> = (0..200).map(|i| 2.0 * i as f64).collect();
        let result = detector.analyze(&data);

        let trend_summary = result.summary.get("trend").expect("ramps should trend");
        assert_eq!(trend_summary.count, 3);
        assert!(trend_summary.avg_strength > 0.99);
        let starts: Vec<usize> = result.patterns.iter().map(|p| p.window_start).collect();
        assert!(starts.contains(&0) && starts.contains(&50) && starts.contains(&100));
    }

    #[test]
    fn summary_tracks_max_strength() {
        let detector = TemporalDetector::with_windowing(100, 10);
        let data = sine_with_drift(150, 10.0, 0.0);
        let result = detector.analyze(&data);
        for summary in result.summary.values() {
            assert!(summary.max_strength >= summary.avg_strength);
            assert!(summary.count >= 1);
        }
    }

    #[test]
    fn confidence_in_unit_interval() {
        let detector = TemporalDetector::with_windowing(50, 25);
        let data: Vec<f64> = (0..500)
            .map(|i| {
                let t = i as f64;
                (2.0 * std::f64::consts::PI * t / 12.0).sin() * (1.0 + t / 500.0)
            })
            .collect();
        let result = detector.analyze(&data);
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        for detected in &result.patterns {
            let s = detected.pattern.strength();
            assert!((0.0..=1.0).contains(&s), "strength {s} out of range");
        }
    }
}
