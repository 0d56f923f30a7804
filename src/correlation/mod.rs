//! Correlation Analysis - multi-method pairwise scoring and causal synthesis
//!
//! Builds the dense symmetric correlation matrix over a set of pattern
//! series, extracts thresholded relationships with Fisher-interval
//! confidence and Student's t significance, sweeps lead/lag structure on
//! demand, and (opt-in) screens relationships for Granger-style causality
//! into a directed network with root-cause extraction.

mod analyzer;
pub mod causal;

pub use analyzer::{
    multi_method_correlation, AsSeries, CorrelationAnalyzer, CorrelationMethod, IndexedSeries,
};
