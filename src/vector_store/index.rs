//! In-memory index state, exact nearest-neighbor search, and index building.

use super::{DistanceMetric, IndexManifest};
use crate::chunking::Chunk;
use crate::corpus::MovieRecord;
use crate::embedding::Embedder;
use crate::error::{PlotlineError, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

/// A chunk and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub chunk_id: String,
    /// Distance under the index metric; smaller is more similar.
    pub distance: f32,
}

/// Vectors plus the chunk and movie metadata they resolve to.
///
/// Read-only once built or loaded.
#[derive(Debug, Clone)]
pub struct IndexState {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
    records: BTreeMap<u32, MovieRecord>,
    positions: HashMap<String, usize>,
}

impl IndexState {
    /// Assemble a state from persisted or freshly built parts.
    ///
    /// Rejects parts that disagree with the manifest: wrong vector length,
    /// wrong chunk count, duplicate chunk IDs or chunks without a movie.
    pub fn from_parts(
        manifest: IndexManifest,
        entries: Vec<IndexEntry>,
        records: Vec<MovieRecord>,
    ) -> Result<Self> {
        if entries.len() != manifest.chunk_count {
            return Err(PlotlineError::IncompatibleIndex(format!(
                "manifest lists {} chunks, found {}",
                manifest.chunk_count,
                entries.len()
            )));
        }

        let records: BTreeMap<u32, MovieRecord> =
            records.into_iter().map(|r| (r.id, r)).collect();

        let mut positions = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.vector.len() != manifest.dimensions {
                return Err(PlotlineError::IncompatibleIndex(format!(
                    "chunk {} has {} dimensions, manifest says {}",
                    entry.chunk.chunk_id,
                    entry.vector.len(),
                    manifest.dimensions
                )));
            }
            if !records.contains_key(&entry.chunk.parent_record_id) {
                return Err(PlotlineError::IncompatibleIndex(format!(
                    "chunk {} refers to unknown movie {}",
                    entry.chunk.chunk_id, entry.chunk.parent_record_id
                )));
            }
            if positions.insert(entry.chunk.chunk_id.clone(), position).is_some() {
                return Err(PlotlineError::IncompatibleIndex(format!(
                    "duplicate chunk id {}",
                    entry.chunk.chunk_id
                )));
            }
        }

        Ok(Self {
            manifest,
            entries,
            records,
            positions,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Movies in ID order.
    pub fn records(&self) -> impl Iterator<Item = &MovieRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    pub fn metric(&self) -> DistanceMetric {
        self.manifest.metric
    }

    /// Look up a chunk by ID.
    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.positions
            .get(chunk_id)
            .map(|&position| &self.entries[position].chunk)
    }

    /// Look up a movie by ID.
    pub fn record(&self, record_id: u32) -> Option<&MovieRecord> {
        self.records.get(&record_id)
    }

    /// The `k` nearest chunks, ascending distance. Equal distances keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.manifest.dimensions {
            return Err(PlotlineError::InvalidQuery(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.manifest.dimensions
            )));
        }

        let metric = self.manifest.metric;
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, metric.distance(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order for ties.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| Neighbor {
                chunk_id: self.entries[position].chunk.chunk_id.clone(),
                distance,
            })
            .collect())
    }
}

/// Embed every chunk and assemble an index. Any embedding failure aborts the
/// whole build; no partial index is returned.
#[instrument(skip_all, fields(chunks = chunks.len()))]
pub async fn build(
    chunks: Vec<Chunk>,
    records: &[MovieRecord],
    embedder: &dyn Embedder,
    metric: DistanceMetric,
    corpus_fingerprint: String,
) -> Result<IndexState> {
    if chunks.is_empty() {
        return Err(PlotlineError::VectorStore(
            "cannot build an index from zero chunks".to_string(),
        ));
    }

    info!("Embedding {} chunks with {}", chunks.len(), embedder.model_id());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await.map_err(|e| match e {
        PlotlineError::Embedding(_) => e,
        other => PlotlineError::Embedding(other.to_string()),
    })?;

    if vectors.len() != chunks.len() {
        return Err(PlotlineError::Embedding(format!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let dimensions = embedder.dimensions();
    if let Some(bad) = vectors.iter().position(|v| v.len() != dimensions) {
        return Err(PlotlineError::Embedding(format!(
            "vector for chunk {} has {} dimensions, expected {}",
            chunks[bad].chunk_id,
            vectors[bad].len(),
            dimensions
        )));
    }

    let manifest = IndexManifest {
        dimensions,
        chunk_count: chunks.len(),
        embedding_model: embedder.model_id(),
        metric,
        corpus_fingerprint,
        built_at: Utc::now(),
    };

    let entries = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexEntry { chunk, vector })
        .collect();

    let state = IndexState::from_parts(manifest, entries, records.to_vec())?;
    debug!("Built index with {} entries", state.len());
    Ok(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;

    /// Embedder that looks vectors up by exact text, falling back to zeros.
    pub struct TableEmbedder {
        pub dimensions: usize,
        pub table: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self
                .table
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dimensions]))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_id(&self) -> String {
            "table".to_string()
        }
    }

    /// Embedder that always fails.
    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(PlotlineError::Embedding("service unavailable".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PlotlineError::Embedding("service unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_id(&self) -> String {
            "failing".to_string()
        }
    }

    pub fn record(id: u32, title: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            year: Some(2000),
            genres: Vec::new(),
            plot: format!("{} plot", title),
        }
    }

    pub fn chunk(record_id: u32, ordinal: usize, text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{}#{}", record_id, ordinal),
            parent_record_id: record_id,
            text: text.to_string(),
            word_range: (0, 2),
        }
    }

    /// Three movies with hand-picked 3-d vectors.
    pub async fn planted_index(metric: DistanceMetric) -> IndexState {
        let records = vec![record(0, "Alpha"), record(1, "Beta"), record(2, "Gamma")];
        let chunks = vec![
            chunk(0, 0, "alpha text"),
            chunk(1, 0, "beta text"),
            chunk(2, 0, "gamma text"),
            chunk(2, 1, "gamma twin"),
        ];
        let table = HashMap::from([
            ("alpha text".to_string(), vec![1.0, 0.0, 0.0]),
            ("beta text".to_string(), vec![0.0, 1.0, 0.0]),
            ("gamma text".to_string(), vec![0.0, 0.0, 1.0]),
            ("gamma twin".to_string(), vec![0.0, 0.0, 1.0]),
        ]);
        let embedder = TableEmbedder { dimensions: 3, table };
        build(chunks, &records, &embedder, metric, "fp".to_string())
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_build_and_search() {
        let state = planted_index(DistanceMetric::Cosine).await;
        assert_eq!(state.len(), 4);
        assert_eq!(state.dimensions(), 3);
        assert_eq!(state.manifest().embedding_model, "table");

        let hits = state.search(&[0.9, 0.1, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk_id, "0#0");
        assert_eq!(hits[1].chunk_id, "1#0");
        assert!(hits[0].distance <= hits[1].distance);

        assert_eq!(state.chunk("1#0").unwrap().text, "beta text");
        assert_eq!(state.record(2).unwrap().title, "Gamma");
        assert!(state.chunk("9#9").is_none());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let state = planted_index(DistanceMetric::Cosine).await;
        let hits = state.search(&[0.0, 0.0, 1.0], 2).unwrap();
        assert_eq!(hits[0].chunk_id, "2#0");
        assert_eq!(hits[1].chunk_id, "2#1");
        assert_eq!(hits[0].distance, hits[1].distance);
    }

    #[tokio::test]
    async fn test_search_is_deterministic_across_builds() {
        let a = planted_index(DistanceMetric::L2).await;
        let b = planted_index(DistanceMetric::L2).await;
        for query in [[0.3, 0.3, 0.3], [1.0, 1.0, 0.0], [0.0, 0.2, 0.9]] {
            assert_eq!(a.search(&query, 4).unwrap(), b.search(&query, 4).unwrap());
        }
    }

    #[tokio::test]
    async fn test_k_larger_than_index_returns_all() {
        let state = planted_index(DistanceMetric::Cosine).await;
        assert_eq!(state.search(&[1.0, 0.0, 0.0], 50).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let state = planted_index(DistanceMetric::Cosine).await;
        let err = state.search(&[1.0, 0.0], 3).unwrap_err();
        assert!(matches!(err, PlotlineError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_build_aborts_on_embedder_failure() {
        let records = vec![record(0, "Alpha")];
        let chunks = vec![chunk(0, 0, "alpha text")];
        let err = build(chunks, &records, &FailingEmbedder, DistanceMetric::Cosine, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlotlineError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_build_rejects_wrong_dimensions() {
        let records = vec![record(0, "Alpha")];
        let chunks = vec![chunk(0, 0, "alpha text")];
        let embedder = TableEmbedder {
            dimensions: 3,
            table: HashMap::from([("alpha text".to_string(), vec![1.0, 0.0])]),
        };
        let err = build(chunks, &records, &embedder, DistanceMetric::Cosine, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlotlineError::Embedding(_)));
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_state() {
        let manifest = IndexManifest {
            dimensions: 2,
            chunk_count: 1,
            embedding_model: "m".to_string(),
            metric: DistanceMetric::Cosine,
            corpus_fingerprint: String::new(),
            built_at: Utc::now(),
        };
        let entry = IndexEntry {
            chunk: chunk(0, 0, "x"),
            vector: vec![1.0, 0.0],
        };

        // Chunk refers to a movie that is not present.
        let err = IndexState::from_parts(manifest.clone(), vec![entry.clone()], Vec::new()).unwrap_err();
        assert!(err.requires_rebuild());

        // Chunk count disagrees with manifest.
        let err = IndexState::from_parts(
            manifest.clone(),
            vec![entry.clone(), entry.clone()],
            vec![record(0, "Alpha")],
        )
        .unwrap_err();
        assert!(matches!(err, PlotlineError::IncompatibleIndex(_)));

        assert!(IndexState::from_parts(manifest, vec![entry], vec![record(0, "Alpha")]).is_ok());
    }
}
