//! Vector Store Client - HTTP adapter for the external persistence service
//!
//! The engine calls five operations (store pattern/anomaly/correlation,
//! recent-data query, similarity search) plus a health probe, all JSON over
//! HTTP. Transport failures come back as typed [`StoreError`]s; callers
//! decide whether to propagate or swallow them (the coordinator logs and
//! drops persistence failures, keeping the in-memory result).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::encoder::{
    anomaly_features, correlation_features, pattern_features, FeatureEncoder, HashingEncoder,
};
use crate::config::StoreConfig;
use crate::types::{AnomalyResult, CorrelationResult, TemporalPatterns};

/// Vector store adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unhealthy: {0}")]
    Unhealthy(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Wire document for `store_*` operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub timestamp: i64,
    pub vector: Vec<f64>,
    pub metadata: serde_json::Value,
    pub content: serde_json::Value,
}

/// One match from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(rename = "type", default)]
    pub doc_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    matches: Vec<SearchMatch>,
}

/// A recent raw series pulled back for the scheduler tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSeries {
    pub id: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Vec<RecentSeries>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// The five-operation contract the engine relies on.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store_pattern(&self, result: &TemporalPatterns) -> Result<(), StoreError>;
    async fn store_anomaly(&self, result: &AnomalyResult) -> Result<(), StoreError>;
    async fn store_correlation(&self, result: &CorrelationResult) -> Result<(), StoreError>;
    async fn get_recent_data(&self, limit: usize) -> Result<Vec<RecentSeries>, StoreError>;
    async fn search_similar_patterns(
        &self,
        vector: &[f64],
        k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError>;
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// HTTP implementation of the vector-store contract.
pub struct HttpVectorStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    encoder: Arc<dyn FeatureEncoder>,
}

impl HttpVectorStore {
    /// Build a client from store configuration with the default hashing
    /// encoder.
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_encoder(config, Arc::new(HashingEncoder::new(config.vector_dimensions)))
    }

    /// Build a client with a custom feature encoder.
    pub fn with_encoder(config: &StoreConfig, encoder: Arc<dyn FeatureEncoder>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            encoder,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        req
    }

    async fn store_document(&self, document: StoreDocument) -> Result<(), StoreError> {
        let resp = self
            .request(reqwest::Method::POST, "/documents")
            .json(&document)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status(resp.status()))
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn store_pattern(&self, result: &TemporalPatterns) -> Result<(), StoreError> {
        let document = StoreDocument {
            id: result.id.clone(),
            doc_type: "pattern".to_string(),
            timestamp: result.timestamp,
            vector: self.encoder.encode(&pattern_features(result)),
            metadata: json!({
                "pattern_count": result.patterns.len(),
                "confidence": result.confidence,
                "dominant": result.dominant.as_ref().map(|d| d.pattern.kind_name()),
            }),
            content: serde_json::to_value(result)?,
        };
        self.store_document(document).await
    }

    async fn store_anomaly(&self, result: &AnomalyResult) -> Result<(), StoreError> {
        let document = StoreDocument {
            id: result.id.clone(),
            doc_type: "anomaly".to_string(),
            timestamp: result.timestamp,
            vector: self.encoder.encode(&anomaly_features(result)),
            metadata: json!({
                "method": result.method,
                "severity": result.severity,
                "critical": result.critical,
                "anomaly_count": result.anomaly_count,
            }),
            content: serde_json::to_value(result)?,
        };
        self.store_document(document).await
    }

    async fn store_correlation(&self, result: &CorrelationResult) -> Result<(), StoreError> {
        let document = StoreDocument {
            id: result.id.clone(),
            doc_type: "correlation".to_string(),
            timestamp: result.timestamp,
            vector: self.encoder.encode(&correlation_features(result)),
            metadata: json!({
                "pattern_count": result.pattern_count,
                "relationship_count": result.relationships.len(),
                "has_causal": result.causal.is_some(),
            }),
            content: serde_json::to_value(result)?,
        };
        self.store_document(document).await
    }

    async fn get_recent_data(&self, limit: usize) -> Result<Vec<RecentSeries>, StoreError> {
        let body = json!({
            "filter": {},
            "sort": {"timestamp": "desc"},
            "limit": limit,
            "types": ["raw"],
        });
        let resp = self
            .request(reqwest::Method::POST, "/query")
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status()));
        }
        let parsed: QueryResponse = resp.json().await?;
        Ok(parsed.documents)
    }

    async fn search_similar_patterns(
        &self,
        vector: &[f64],
        k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        let body = json!({
            "vector": vector,
            "k": k,
            "filter": {"type": "pattern"},
            "include_metadata": true,
        });
        let resp = self
            .request(reqwest::Method::POST, "/search")
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status()));
        }
        let parsed: SearchResponse = resp.json().await?;
        Ok(parsed.matches)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let resp = self.request(reqwest::Method::GET, "/health").send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::Status(resp.status()));
        }
        let parsed: HealthResponse = resp.json().await?;
        if parsed.status == "healthy" {
            Ok(())
        } else {
            Err(StoreError::Unhealthy(parsed.status))
        }
    }
}

/// In-memory store for tests and store-less deployments.
///
/// Captures stored documents and serves configured recent data; never fails.
#[derive(Default)]
pub struct InMemoryStore {
    documents: std::sync::Mutex<Vec<StoreDocument>>,
    recent: std::sync::Mutex<Vec<RecentSeries>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the recent-data response used by the scheduler tick.
    pub fn set_recent(&self, series: Vec<RecentSeries>) {
        if let Ok(mut guard) = self.recent.lock() {
            *guard = series;
        }
    }

    /// Snapshot of captured documents.
    pub fn documents(&self) -> Vec<StoreDocument> {
        self.documents.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn push(&self, document: StoreDocument) {
        if let Ok(mut guard) = self.documents.lock() {
            guard.push(document);
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn store_pattern(&self, result: &TemporalPatterns) -> Result<(), StoreError> {
        self.push(StoreDocument {
            id: result.id.clone(),
            doc_type: "pattern".to_string(),
            timestamp: result.timestamp,
            vector: Vec::new(),
            metadata: json!({}),
            content: serde_json::to_value(result)?,
        });
        Ok(())
    }

    async fn store_anomaly(&self, result: &AnomalyResult) -> Result<(), StoreError> {
        self.push(StoreDocument {
            id: result.id.clone(),
            doc_type: "anomaly".to_string(),
            timestamp: result.timestamp,
            vector: Vec::new(),
            metadata: json!({"critical": result.critical}),
            content: serde_json::to_value(result)?,
        });
        Ok(())
    }

    async fn store_correlation(&self, result: &CorrelationResult) -> Result<(), StoreError> {
        self.push(StoreDocument {
            id: result.id.clone(),
            doc_type: "correlation".to_string(),
            timestamp: result.timestamp,
            vector: Vec::new(),
            metadata: json!({}),
            content: serde_json::to_value(result)?,
        });
        Ok(())
    }

    async fn get_recent_data(&self, limit: usize) -> Result<Vec<RecentSeries>, StoreError> {
        let recent = self.recent.lock().map(|g| g.clone()).unwrap_or_default();
        Ok(recent.into_iter().take(limit).collect())
    }

    async fn search_similar_patterns(
        &self,
        _vector: &[f64],
        _k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_wire_shape() {
        let document = StoreDocument {
            id: "pat_0123456789abcdef".to_string(),
            doc_type: "pattern".to_string(),
            timestamp: 1_700_000_000_000,
            vector: vec![0.6, 0.8],
            metadata: json!({"confidence": 0.9}),
            content: json!({"patterns": []}),
        };
        let wire = serde_json::to_value(&document).unwrap();
        assert_eq!(wire["type"], "pattern");
        assert_eq!(wire["id"], "pat_0123456789abcdef");
        assert!(wire["vector"].is_array());
        assert!(wire["metadata"]["confidence"].as_f64().is_some());
    }

    #[test]
    fn timeout_error_maps_from_reqwest() {
        // Shape check only: the From impl distinguishes timeouts.
        let status_err = StoreError::Status(reqwest::StatusCode::BAD_GATEWAY);
        assert!(status_err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn in_memory_store_captures_documents() {
        let store = InMemoryStore::new();
        let result = crate::temporal::TemporalDetector::with_windowing(10, 5).analyze(&[1.0; 20]);
        store.store_pattern(&result).await.unwrap();

        let documents = store.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].doc_type, "pattern");
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn in_memory_store_serves_recent() {
        let store = InMemoryStore::new();
        store.set_recent(vec![
            RecentSeries {
                id: "a".to_string(),
                values: vec![1.0, 2.0],
            },
            RecentSeries {
                id: "b".to_string(),
                values: vec![3.0],
            },
        ]);
        let recent = store.get_recent_data(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "a");
    }
}
