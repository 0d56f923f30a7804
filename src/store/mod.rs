//! Vector Store Adapter - persistence boundary for engine artifacts
//!
//! The engine persists patterns, anomalies, and correlations as JSON
//! documents with L2-normalized feature vectors, and pulls recent raw data
//! back for scheduler ticks. All transport failures are typed; persistence
//! is best-effort from the coordinator's point of view.

mod client;
mod encoder;

pub use client::{
    HttpVectorStore, InMemoryStore, RecentSeries, SearchMatch, StoreDocument, StoreError,
    VectorStore,
};
pub use encoder::{
    anomaly_features, correlation_features, pattern_features, FeatureEncoder, HashingEncoder,
};
