//! In-memory vector store implementation.
//!
//! Holds the last saved index for the lifetime of the process. Useful for
//! testing and for runs that should always rebuild.

use super::{IndexExpectation, IndexState, VectorStore};
use crate::error::{PlotlineError, Result};
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    state: RwLock<Option<IndexState>>,
}

impl MemoryVectorStore {
    /// Create a new, empty in-memory vector store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for MemoryVectorStore {
    fn save(&self, state: &IndexState) -> Result<()> {
        let mut slot = self.state.write().map_err(|e| {
            PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e))
        })?;
        *slot = Some(state.clone());
        Ok(())
    }

    fn load(&self, expected: &IndexExpectation) -> Result<IndexState> {
        let slot = self.state.read().map_err(|e| {
            PlotlineError::VectorStore(format!("Failed to acquire lock: {}", e))
        })?;
        let state = slot
            .as_ref()
            .ok_or_else(|| PlotlineError::IndexNotFound(self.location()))?;
        state.manifest().check(expected)?;
        Ok(state.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::planted_index;
    use crate::vector_store::DistanceMetric;

    fn expectation() -> IndexExpectation {
        IndexExpectation {
            dimensions: 3,
            embedding_model: "table".to_string(),
            metric: DistanceMetric::Cosine,
            corpus_fingerprint: Some("fp".to_string()),
        }
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        assert!(matches!(store.load(&expectation()), Err(PlotlineError::IndexNotFound(_))));

        let state = planted_index(DistanceMetric::Cosine).await;
        store.save(&state).unwrap();

        let loaded = store.load(&expectation()).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(
            loaded.search(&[0.0, 1.0, 0.0], 2).unwrap(),
            state.search(&[0.0, 1.0, 0.0], 2).unwrap()
        );

        let mut other = expectation();
        other.dimensions = 5;
        assert!(matches!(store.load(&other), Err(PlotlineError::IncompatibleIndex(_))));
    }
}
