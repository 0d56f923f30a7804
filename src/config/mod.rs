//! Engine Configuration Module
//!
//! Provides deployment configuration loaded from TOML files, replacing
//! hardcoded thresholds with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `PATTERN_ENGINE_CONFIG` environment variable (path to TOML file)
//! 2. `pattern_engine.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere in the codebase:
//! let threshold = config::get().detection.correlation_threshold;
//! ```
//!
//! Every constructor in the crate also accepts an explicit config, so tests
//! never need the global.

mod engine_config;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Subsequent calls are ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get the global engine configuration, falling back to defaults when
/// `init()` was never called.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG.get_or_init(EngineConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
