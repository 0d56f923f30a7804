//! Engine Configuration - All tunable thresholds as operator-editable TOML values
//!
//! Every knob the engine recognizes is a field here. Each struct implements
//! `Default` with the shipped values, so behavior is unchanged when no config
//! file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root configuration for an engine deployment.
///
/// Load with [`EngineConfig::load`] which searches:
/// 1. `$PATTERN_ENGINE_CONFIG` env var
/// 2. `./pattern_engine.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Detection scheduler and thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Viability model options
    #[serde(default)]
    pub vsm: VsmConfig,

    /// Temporal windowing
    #[serde(default)]
    pub windowing: WindowingConfig,

    /// Vector store connection
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            vsm: VsmConfig::default(),
            windowing: WindowingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Detection thresholds and scheduler cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Scheduler tick interval in milliseconds
    #[serde(default = "defaults::detection_interval_ms")]
    pub detection_interval_ms: u64,

    /// Anomaly score threshold for flagging
    #[serde(default = "defaults::anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Minimum |r| for a relationship to be retained
    #[serde(default = "defaults::correlation_threshold")]
    pub correlation_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: defaults::detection_interval_ms(),
            anomaly_threshold: defaults::anomaly_threshold(),
            correlation_threshold: defaults::correlation_threshold(),
        }
    }
}

/// Variety management strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarietyManagement {
    /// Ashby's law: system variety must match environmental variety.
    Requisite,
    /// Attenuate incoming variety before it reaches higher levels.
    Attenuating,
    /// Amplify management variety downward.
    Amplifying,
}

/// Viability model options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsmConfig {
    /// Nested control tiers of the viability model
    #[serde(default = "defaults::recursion_levels")]
    pub recursion_levels: u32,

    #[serde(default = "defaults::variety_management")]
    pub variety_management: VarietyManagement,

    /// Enable internal feedback loops
    #[serde(default = "defaults::enabled")]
    pub feedback_loops: bool,

    /// Enable the out-of-band algedonic channel
    #[serde(default = "defaults::enabled")]
    pub algedonic_signals: bool,
}

impl Default for VsmConfig {
    fn default() -> Self {
        Self {
            recursion_levels: defaults::recursion_levels(),
            variety_management: defaults::variety_management(),
            feedback_loops: true,
            algedonic_signals: true,
        }
    }
}

/// Temporal windowing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowingConfig {
    /// Samples per analysis window
    #[serde(default = "defaults::window_size")]
    pub window_size: usize,

    /// Samples to advance between windows
    #[serde(default = "defaults::slide_interval")]
    pub slide_interval: usize,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::window_size(),
            slide_interval: defaults::slide_interval(),
        }
    }
}

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "defaults::store_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::store_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token; omitted header when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Feature encoder model identifier
    #[serde(default = "defaults::encoder_model")]
    pub encoder_model: String,

    /// Dimensionality of stored vectors
    #[serde(default = "defaults::vector_dimensions")]
    pub vector_dimensions: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: defaults::store_url(),
            timeout_secs: defaults::store_timeout_secs(),
            api_key: None,
            encoder_model: defaults::encoder_model(),
            vector_dimensions: defaults::vector_dimensions(),
        }
    }
}

/// Default values, kept in one place so serde defaults and `Default` impls
/// cannot drift apart.
pub mod defaults {
    use super::VarietyManagement;

    pub fn detection_interval_ms() -> u64 {
        5000
    }
    pub fn anomaly_threshold() -> f64 {
        0.8
    }
    pub fn correlation_threshold() -> f64 {
        0.7
    }
    pub fn recursion_levels() -> u32 {
        5
    }
    pub fn variety_management() -> VarietyManagement {
        VarietyManagement::Requisite
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn window_size() -> usize {
        100
    }
    pub fn slide_interval() -> usize {
        10
    }
    pub fn store_url() -> String {
        "http://localhost:8000".to_string()
    }
    pub fn store_timeout_secs() -> u64 {
        5
    }
    pub fn encoder_model() -> String {
        "default".to_string()
    }
    pub fn vector_dimensions() -> usize {
        384
    }
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PATTERN_ENGINE_CONFIG` environment variable
    /// 2. `./pattern_engine.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PATTERN_ENGINE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from PATTERN_ENGINE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PATTERN_ENGINE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PATTERN_ENGINE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = Path::new("pattern_engine.toml");
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!("Loaded engine config from ./pattern_engine.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse ./pattern_engine.toml, using defaults");
                }
            }
        }

        info!("Using built-in default engine config");
        Self::default()
    }

    /// Parse a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Scheduler tick interval as a `Duration`.
    pub fn detection_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.detection.detection_interval_ms)
    }

    /// Vector store request timeout as a `Duration`.
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store.timeout_secs)
    }
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.detection.detection_interval_ms, 5000);
        assert!((config.detection.anomaly_threshold - 0.8).abs() < 1e-12);
        assert!((config.detection.correlation_threshold - 0.7).abs() < 1e-12);
        assert_eq!(config.vsm.recursion_levels, 5);
        assert_eq!(config.vsm.variety_management, VarietyManagement::Requisite);
        assert!(config.vsm.feedback_loops);
        assert!(config.vsm.algedonic_signals);
        assert_eq!(config.windowing.window_size, 100);
        assert_eq!(config.windowing.slide_interval, 10);
        assert_eq!(config.store.vector_dimensions, 384);
        assert_eq!(config.store.timeout_secs, 5);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
            [detection]
            anomaly_threshold = 0.9

            [store]
            url = "http://vectors.internal:9200"
            api_key = "secret"
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!((config.detection.anomaly_threshold - 0.9).abs() < 1e-12);
        // Untouched keys keep their defaults.
        assert_eq!(config.detection.detection_interval_ms, 5000);
        assert_eq!(config.store.url, "http://vectors.internal:9200");
        assert_eq!(config.store.api_key.as_deref(), Some("secret"));
        assert_eq!(config.store.vector_dimensions, 384);
    }

    #[test]
    fn variety_management_parses_snake_case() {
        let config: EngineConfig =
            toml::from_str("[vsm]\nvariety_management = \"attenuating\"").unwrap();
        assert_eq!(config.vsm.variety_management, VarietyManagement::Attenuating);
    }
}
