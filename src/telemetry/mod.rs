//! Telemetry Emitter - fixed-namespace engine events
//!
//! Every event is logged through `tracing` under the `pattern_engine`
//! target and broadcast to any subscribed sinks. Emission is fire-and-
//! forget: a full or absent subscriber never blocks the engine. Critical
//! anomalies take the out-of-band algedonic path — logged at error level so
//! they bypass ordinary telemetry filtering.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Broadcast buffer size; slow subscribers lose oldest events.
const CHANNEL_CAPACITY: usize = 256;

/// Install the global tracing subscriber for engine deployments.
///
/// Respects `RUST_LOG`; defaults to `info`. Safe to call more than once —
/// later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Engine telemetry events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    PatternAnalyzed {
        count: usize,
        duration_ms: u64,
    },
    AnomalyDetected {
        count: usize,
        critical: bool,
    },
    /// Algedonic-signal path; emitted exactly once per critical detection.
    CriticalAnomaly {
        signal: String,
    },
    Vsm {
        variety_ratio: f64,
        viability_score: f64,
    },
    VectorStore {
        ops: u64,
        query_ms: u64,
        connected: bool,
    },
    Memory {
        bytes: u64,
    },
}

/// Fire-and-forget telemetry emitter.
#[derive(Debug, Clone)]
pub struct TelemetryEmitter {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl TelemetryEmitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe an external sink.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    /// Emit an event: structured log plus best-effort broadcast.
    pub fn emit(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::PatternAnalyzed { count, duration_ms } => {
                info!(target: "pattern_engine", count, duration_ms, "pattern_analyzed");
            }
            TelemetryEvent::AnomalyDetected { count, critical } => {
                info!(target: "pattern_engine", count, critical, "anomaly_detected");
            }
            TelemetryEvent::CriticalAnomaly { signal } => {
                // Out-of-band: error level bypasses normal telemetry filters.
                error!(target: "pattern_engine", signal = %signal, "critical_anomaly");
            }
            TelemetryEvent::Vsm {
                variety_ratio,
                viability_score,
            } => {
                info!(target: "pattern_engine", variety_ratio, viability_score, "vsm");
            }
            TelemetryEvent::VectorStore {
                ops,
                query_ms,
                connected,
            } => {
                info!(target: "pattern_engine", ops, query_ms, connected, "vector_store");
            }
            TelemetryEvent::Memory { bytes } => {
                info!(target: "pattern_engine", bytes, "memory");
            }
        }

        // No subscribers is fine; emission never fails the caller.
        let _ = self.sender.send(event);
    }
}

impl Default for TelemetryEmitter {
    fn default() -> Self {
        Self::new()
    }
}
