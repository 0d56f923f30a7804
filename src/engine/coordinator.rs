//! Engine Coordinator - fuses detector output into the viability state.
//!
//! The coordinator owns all mutable engine state behind one `RwLock`; every
//! public operation takes the lock for its entire mutation, so each call is
//! atomic with respect to state regardless of caller interleaving. The
//! detectors themselves are stateless and run outside the lock.
//!
//! Persistence is best-effort: a failed store call is logged at error level
//! and the in-memory result is still returned. Scheduler ticks pull recent
//! data from the vector store and run the full detection pipeline; a failed
//! tick logs and never skips future ticks.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::anomaly::{AnomalyDetector, DetectionOptions};
use crate::config::EngineConfig;
use crate::correlation::CorrelationAnalyzer;
use crate::store::VectorStore;
use crate::telemetry::{TelemetryEmitter, TelemetryEvent};
use crate::temporal::TemporalDetector;
use crate::types::{
    AnomalyResult, CorrelationResult, DetectionMethod, TemporalPatterns, Viability, VsmState,
};

/// Most recent anomalies retained in state.
const MAX_RETAINED_ANOMALIES: usize = 100;

/// Most recent patterns retained in state.
const MAX_RETAINED_PATTERNS: usize = 1000;

/// Pattern count at which the richness term of the viability score saturates.
const VIABILITY_PATTERN_TARGET: f64 = 50.0;

/// Series pulled from the store per scheduler tick.
const RECENT_DATA_LIMIT: usize = 20;

/// Monotonic operation counters.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct EngineCounters {
    pub patterns_analyzed: u64,
    pub anomalies_detected: u64,
    pub correlations_found: u64,
}

/// Snapshot returned by `get_system_state`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemState {
    pub vsm_state: VsmState,
    pub counters: EngineCounters,
    pub pattern_count: usize,
    pub anomaly_count: usize,
    pub correlation_count: usize,
    pub variety_ratio: f64,
    pub viability_score: f64,
}

/// All mutable engine state; only touched under the coordinator's lock.
struct EngineState {
    patterns: HashMap<String, TemporalPatterns>,
    /// Insertion order for pattern pruning.
    pattern_order: VecDeque<String>,
    /// Most recent anomalies, oldest first.
    anomalies: VecDeque<AnomalyResult>,
    correlations: HashMap<String, CorrelationResult>,
    vsm: VsmState,
    counters: EngineCounters,
}

impl EngineState {
    fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            pattern_order: VecDeque::new(),
            anomalies: VecDeque::new(),
            correlations: HashMap::new(),
            vsm: VsmState::default(),
            counters: EngineCounters::default(),
        }
    }

    fn viability_score(&self) -> f64 {
        let variety_ratio = self.vsm.variety_ratio();
        let anomaly_term = 1.0 - self.anomalies.len() as f64 / MAX_RETAINED_ANOMALIES as f64;
        let richness_term = (self.patterns.len() as f64 / VIABILITY_PATTERN_TARGET).min(1.0);
        (variety_ratio + anomaly_term + richness_term) / 3.0
    }
}

/// Serial owner of the engine's viability state.
pub struct EngineCoordinator {
    config: EngineConfig,
    temporal: TemporalDetector,
    state: RwLock<EngineState>,
    store: Option<Arc<dyn VectorStore>>,
    telemetry: TelemetryEmitter,
}

impl EngineCoordinator {
    /// Coordinator without persistence (in-memory only).
    pub fn new(config: EngineConfig) -> Self {
        let temporal = TemporalDetector::with_windowing(
            config.windowing.window_size,
            config.windowing.slide_interval,
        );
        Self {
            config,
            temporal,
            state: RwLock::new(EngineState::new()),
            store: None,
            telemetry: TelemetryEmitter::new(),
        }
    }

    /// Attach a vector store for best-effort persistence.
    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Telemetry emitter for subscribing external sinks.
    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.telemetry
    }

    /// Run temporal detection, persist, and retain the result.
    pub async fn analyze_pattern(&self, data: &[f64]) -> TemporalPatterns {
        let started = Instant::now();
        let result = self.temporal.analyze(data);

        self.persist_pattern(&result).await;

        {
            let mut state = self.state.write().await;
            state
                .pattern_order
                .push_back(result.id.clone());
            state.patterns.insert(result.id.clone(), result.clone());
            while state.patterns.len() > MAX_RETAINED_PATTERNS {
                if let Some(oldest) = state.pattern_order.pop_front() {
                    state.patterns.remove(&oldest);
                } else {
                    break;
                }
            }
            state.counters.patterns_analyzed += 1;
        }

        self.telemetry.emit(TelemetryEvent::PatternAnalyzed {
            count: result.patterns.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });

        result
    }

    /// Run anomaly detection and fold the outcome into the viability state.
    ///
    /// Without an explicit baseline the current VSM state stands in: its
    /// level varieties are the baseline sequence. A critical result raises
    /// the algedonic channel and emits the out-of-band signal exactly once.
    pub async fn detect_anomaly(
        &self,
        data: &[f64],
        baseline: Option<&[f64]>,
        options: DetectionOptions,
    ) -> (AnomalyResult, Viability) {
        // This coordinator's configured recursion depth governs VSM
        // classification; an explicit per-run override still wins.
        let options = DetectionOptions {
            recursion_depth: options
                .recursion_depth
                .or(Some(f64::from(self.config.vsm.recursion_levels))),
            ..options
        };
        let detector = AnomalyDetector::new(options);
        let result = match baseline {
            Some(baseline) => detector.detect(data, baseline),
            None => {
                let state = self.state.read().await;
                if options.method == DetectionMethod::VsmBased {
                    detector.detect_against_state(data, &state.vsm)
                } else {
                    let fallback = state.vsm.level_varieties();
                    drop(state);
                    detector.detect(data, &fallback)
                }
            }
        };

        let critical = result.critical && self.config.vsm.algedonic_signals;
        let variety_ratio;
        {
            let mut state = self.state.write().await;
            if result.anomaly_detected {
                state.counters.anomalies_detected += result.anomaly_count as u64;
                state.anomalies.push_back(result.clone());
                while state.anomalies.len() > MAX_RETAINED_ANOMALIES {
                    state.anomalies.pop_front();
                }
            }
            if critical {
                let timestamp = result.timestamp;
                state.vsm.raise_algedonic(result.description.clone(), timestamp);
            }
            variety_ratio = state.vsm.variety_ratio();
        }

        self.telemetry.emit(TelemetryEvent::AnomalyDetected {
            count: result.anomaly_count,
            critical: result.critical,
        });
        if critical {
            self.telemetry.emit(TelemetryEvent::CriticalAnomaly {
                signal: result.description.clone(),
            });
        }

        if result.anomaly_detected {
            self.persist_anomaly(&result).await;
        }

        let viability = Viability {
            viable: variety_ratio >= 1.0 && !result.critical,
            variety_ratio,
            recommendations: result.recommendations.clone(),
        };

        (result, viability)
    }

    /// Correlate a set of pattern series; persist only significant results.
    pub async fn correlate_patterns(
        &self,
        series: &[Vec<f64>],
        analyze_causality: bool,
    ) -> CorrelationResult {
        let analyzer = CorrelationAnalyzer::new()
            .with_threshold(self.config.detection.correlation_threshold)
            .with_causality(analyze_causality);
        let result = analyzer.analyze(series);

        if result.is_significant() {
            self.persist_correlation(&result).await;
        }

        {
            let mut state = self.state.write().await;
            state.counters.correlations_found += result.relationships.len() as u64;
            state.correlations.insert(result.id.clone(), result.clone());
        }

        result
    }

    /// Snapshot the viability state.
    pub async fn get_system_state(&self) -> SystemState {
        let state = self.state.read().await;
        let variety_ratio = state.vsm.variety_ratio();
        let viability_score = state.viability_score();

        self.telemetry.emit(TelemetryEvent::Vsm {
            variety_ratio,
            viability_score,
        });

        SystemState {
            vsm_state: state.vsm.clone(),
            counters: state.counters,
            pattern_count: state.patterns.len(),
            anomaly_count: state.anomalies.len(),
            correlation_count: state.correlations.len(),
            variety_ratio,
            viability_score,
        }
    }

    /// Spawn the detection scheduler (call from a tokio runtime).
    ///
    /// Each tick pulls recent data from the vector store and runs the full
    /// pipeline. Tick failures are logged; the loop never stops.
    pub fn spawn_scheduler(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let interval = coordinator.config.detection_interval();
        info!(
            interval_ms = interval.as_millis() as u64,
            "Detection scheduler started"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A tick delayed by a slow pipeline run shifts the schedule
            // instead of bursting to catch up.
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.run_tick().await;
            }
        })
    }

    /// One scheduler tick: pull recent series, analyze each.
    pub async fn run_tick(&self) {
        let Some(store) = &self.store else {
            debug!("No vector store attached — scheduler tick idle");
            return;
        };

        let started = Instant::now();
        match store.get_recent_data(RECENT_DATA_LIMIT).await {
            Ok(recent) => {
                self.telemetry.emit(TelemetryEvent::VectorStore {
                    ops: 1,
                    query_ms: started.elapsed().as_millis() as u64,
                    connected: true,
                });

                for series in &recent {
                    if series.values.is_empty() {
                        continue;
                    }
                    let _ = self.analyze_pattern(&series.values).await;
                    let _ = self
                        .detect_anomaly(
                            &series.values,
                            None,
                            DetectionOptions::method(DetectionMethod::VsmBased),
                        )
                        .await;
                }
                debug!(series = recent.len(), "Scheduler tick complete");
            }
            Err(e) => {
                // Logged, never propagated; the next tick runs regardless.
                error!(error = %e, "Scheduler tick failed to pull recent data");
                self.telemetry.emit(TelemetryEvent::VectorStore {
                    ops: 1,
                    query_ms: started.elapsed().as_millis() as u64,
                    connected: false,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Best-effort persistence
    // ------------------------------------------------------------------

    async fn persist_pattern(&self, result: &TemporalPatterns) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store_pattern(result).await {
                error!(id = %result.id, error = %e, "Failed to persist pattern — keeping in-memory result");
            }
        }
    }

    async fn persist_anomaly(&self, result: &AnomalyResult) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store_anomaly(result).await {
                error!(id = %result.id, error = %e, "Failed to persist anomaly — keeping in-memory result");
            }
        }
    }

    async fn persist_correlation(&self, result: &CorrelationResult) {
        if let Some(store) = &self.store {
            if let Err(e) = store.store_correlation(result).await {
                error!(id = %result.id, error = %e, "Failed to persist correlation — keeping in-memory result");
            }
        }
    }
}
