//! Viable System Model state: recursion levels, environment, algedonic channel.

use serde::{Deserialize, Serialize};

/// Number of recursion levels in the viability model.
pub const RECURSION_LEVELS: usize = 5;

/// One control tier of the viability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VsmLevel {
    /// Variety currently absorbed by this level.
    pub variety: f64,
    /// Maximum variety this level can absorb.
    pub capacity: f64,
}

/// The environment the system must match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub variety: f64,
    /// Environmental uncertainty in [0, 1].
    pub uncertainty: f64,
}

/// Out-of-band alert channel for critical viability threats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgedonicChannel {
    pub active: bool,
    pub last_signal: Option<String>,
    /// Epoch milliseconds of the last signal.
    pub timestamp: Option<i64>,
}

/// Full VSM state owned by the engine coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsmState {
    pub levels: [VsmLevel; RECURSION_LEVELS],
    pub environment: Environment,
    pub algedonic_channel: AlgedonicChannel,
}

impl Default for VsmState {
    /// Commissioning defaults: level varieties 100/80/60/40/20 against an
    /// environment variety of 200, giving an initial ratio of 1.5.
    fn default() -> Self {
        let varieties = [100.0, 80.0, 60.0, 40.0, 20.0];
        let capacities = [150.0, 120.0, 100.0, 80.0, 50.0];
        let mut levels = [VsmLevel {
            variety: 0.0,
            capacity: 0.0,
        }; RECURSION_LEVELS];
        for (i, level) in levels.iter_mut().enumerate() {
            level.variety = varieties[i];
            level.capacity = capacities[i];
        }
        Self {
            levels,
            environment: Environment {
                variety: 200.0,
                uncertainty: 0.3,
            },
            algedonic_channel: AlgedonicChannel::default(),
        }
    }
}

impl VsmState {
    /// Sum of varieties across all recursion levels.
    pub fn total_variety(&self) -> f64 {
        self.levels.iter().map(|l| l.variety).sum()
    }

    /// Requisite variety ratio: system variety over environment variety.
    ///
    /// Returns 0.0 when the environment variety is zero.
    pub fn variety_ratio(&self) -> f64 {
        if self.environment.variety <= 0.0 {
            return 0.0;
        }
        self.total_variety() / self.environment.variety
    }

    /// Flattened level varieties, used as the default VSM baseline sequence.
    pub fn level_varieties(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.variety).collect()
    }

    /// Raise the algedonic channel with a signal description.
    pub fn raise_algedonic(&mut self, signal: impl Into<String>, timestamp: i64) {
        self.algedonic_channel.active = true;
        self.algedonic_channel.last_signal = Some(signal.into());
        self.algedonic_channel.timestamp = Some(timestamp);
    }
}
