//! Query-time retrieval of the most relevant plot chunks.

use crate::chunking::Chunk;
use crate::corpus::MovieRecord;
use crate::embedding::Embedder;
use crate::error::{PlotlineError, Result};
use crate::vector_store::{DistanceMetric, IndexState};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How many candidates per requested chunk are scored against the threshold.
const CANDIDATE_FACTOR: usize = 3;

/// A retrieved chunk with its movie and scores.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub record: MovieRecord,
    /// Distance under the index metric (smaller is better).
    pub distance: f32,
    /// Similarity derived from the distance (higher is better).
    pub score: f32,
}

/// Embeds queries and resolves the nearest chunks back to their metadata.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            top_k: 3,
            min_score: 0.3,
        }
    }

    /// Set the default number of chunks per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed the query vector for `query`.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlotlineError::InvalidArgument("query must not be empty".to_string()));
        }
        self.embedder.embed(query).await
    }

    /// Retrieve the `k` (default `top_k`) most relevant chunks, most relevant first.
    ///
    /// `k == 0` is rejected; a `k` above the number of indexed chunks is clamped.
    #[instrument(skip(self, state), fields(query = %query))]
    pub async fn retrieve(
        &self,
        state: &IndexState,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        let k = self.resolve_k(state, k)?;
        let vector = self.embed_query(query).await?;
        self.retrieve_by_vector(state, &vector, k)
    }

    /// Validate and clamp a requested `k` against the index.
    pub fn resolve_k(&self, state: &IndexState, k: Option<usize>) -> Result<usize> {
        let requested = k.unwrap_or(self.top_k);
        if requested == 0 {
            return Err(PlotlineError::InvalidArgument("k must be at least 1".to_string()));
        }
        if requested > state.len() {
            debug!("Clamping k from {} to {} indexed chunks", requested, state.len());
        }
        Ok(requested.min(state.len()))
    }

    /// Retrieve from an already embedded query.
    ///
    /// Under the cosine metric, candidates scoring at least `min_score` are
    /// preferred; when none do, the plain nearest `k` are returned so that a
    /// non-empty index always answers. Other metrics return the nearest `k`.
    pub fn retrieve_by_vector(
        &self,
        state: &IndexState,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let depth = k.saturating_mul(CANDIDATE_FACTOR).min(state.len());
        let metric = state.metric();
        let candidates: Vec<RetrievedChunk> = state
            .search(vector, depth)?
            .into_iter()
            .filter_map(|neighbor| {
                let resolved = state.chunk(&neighbor.chunk_id).and_then(|chunk| {
                    state.record(chunk.parent_record_id).map(|record| RetrievedChunk {
                        chunk: chunk.clone(),
                        record: record.clone(),
                        distance: neighbor.distance,
                        score: metric.similarity(neighbor.distance),
                    })
                });
                if resolved.is_none() {
                    warn!("Chunk {} could not be resolved", neighbor.chunk_id);
                }
                resolved
            })
            .collect();

        // The threshold is a cosine similarity; L2 scores are not comparable to it.
        if metric != DistanceMetric::Cosine {
            let results: Vec<RetrievedChunk> = candidates.into_iter().take(k).collect();
            debug!("Retrieved {} chunks", results.len());
            return Ok(results);
        }

        let above: Vec<RetrievedChunk> = candidates
            .iter()
            .filter(|c| c.score >= self.min_score)
            .take(k)
            .cloned()
            .collect();

        let results = if above.is_empty() {
            debug!("No chunk reached min_score {}, using nearest {}", self.min_score, k);
            candidates.into_iter().take(k).collect()
        } else {
            above
        };

        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }
}

/// Titles of the movies behind `chunks`, deduplicated in retrieval order.
pub fn movie_titles(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for chunk in chunks {
        if !titles.contains(&chunk.record.title) {
            titles.push(chunk.record.title.clone());
        }
    }
    titles
}
