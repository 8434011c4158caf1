//! Vector index and its persistence backends.
//!
//! [`IndexState`] holds every chunk vector together with the chunk and movie
//! metadata needed to answer a query. The [`VectorStore`] backends persist it
//! as a unit so that an unchanged corpus is not re-embedded on every run; the
//! store is a cache, never updated incrementally.

mod index;
mod memory;
mod sqlite;

pub use index::{build, IndexEntry, IndexState, Neighbor};
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

#[cfg(test)]
pub(crate) use index::test_support;

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{PlotlineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance metric used to rank chunks. Smaller distances are more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `0.0..=2.0`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }

    /// Convert a distance back into a similarity score (higher is better).
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
            DistanceMetric::L2 => 1.0 / (1.0 + distance),
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::L2 => write!(f, "l2"),
        }
    }
}

/// Metadata persisted alongside the vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Dimensionality shared by every vector.
    pub dimensions: usize,
    /// Number of chunks in the index.
    pub chunk_count: usize,
    /// Embedding model that produced the vectors.
    pub embedding_model: String,
    pub metric: DistanceMetric,
    /// Fingerprint of the corpus and chunking configuration.
    pub corpus_fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// What the current configuration expects a persisted index to look like.
#[derive(Debug, Clone)]
pub struct IndexExpectation {
    pub dimensions: usize,
    pub embedding_model: String,
    pub metric: DistanceMetric,
    /// `None` skips the corpus check.
    pub corpus_fingerprint: Option<String>,
}

impl IndexManifest {
    /// Check a stored manifest against the current configuration.
    pub fn check(&self, expected: &IndexExpectation) -> Result<()> {
        if self.dimensions != expected.dimensions {
            return Err(PlotlineError::IncompatibleIndex(format!(
                "stored vectors have {} dimensions, embedder produces {}",
                self.dimensions, expected.dimensions
            )));
        }
        if self.embedding_model != expected.embedding_model {
            return Err(PlotlineError::IncompatibleIndex(format!(
                "index was built with '{}', current embedder is '{}'",
                self.embedding_model, expected.embedding_model
            )));
        }
        if self.metric != expected.metric {
            return Err(PlotlineError::IncompatibleIndex(format!(
                "index uses {} distance, configuration asks for {}",
                self.metric, expected.metric
            )));
        }
        if let Some(fingerprint) = &expected.corpus_fingerprint {
            if &self.corpus_fingerprint != fingerprint {
                return Err(PlotlineError::IncompatibleIndex(
                    "corpus or chunking configuration changed since the index was built".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Trait for index persistence backends.
pub trait VectorStore: Send + Sync {
    /// Persist the whole index, replacing whatever was stored before.
    fn save(&self, state: &IndexState) -> Result<()>;

    /// Restore a persisted index.
    ///
    /// Fails with `IndexNotFound` when nothing was saved and with
    /// `IncompatibleIndex` when the stored index does not match `expected`.
    fn load(&self, expected: &IndexExpectation) -> Result<IndexState>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Create the configured vector store.
pub fn create_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => Ok(Arc::new(SqliteVectorStore::new(
            &settings.index_dir().join("index.db"),
        )?)),
        VectorStoreProvider::Memory => Ok(Arc::new(MemoryVectorStore::new())),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
