//! Pipeline orchestrator for Plotline.
//!
//! Coordinates the whole process from loading the corpus to answering a
//! question: reuse or rebuild the index, then retrieve and synthesize.

use crate::chunking::{chunk_all, create_chunker};
use crate::config::{Prompts, Settings};
use crate::corpus;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{PlotlineError, Result};
use crate::rag::{create_generator, AnswerSynthesizer, Generator, QueryResult, QueryStage};
use crate::retrieval::{RetrievedChunk, Retriever};
use crate::vector_store::{self, create_vector_store, IndexExpectation, IndexState, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// The main orchestrator for the Plotline pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    state: Option<IndexState>,
}

impl Orchestrator {
    /// Create a new orchestrator with components chosen by `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let embedder = create_embedder(&settings.embedding)?;
        let vector_store = create_vector_store(&settings)?;
        let generator = create_generator(&settings.rag, &prompts)?;

        Self::with_components(settings, prompts, embedder, vector_store, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Result<Self> {
        settings.validate()?;

        let retriever = Retriever::new(embedder.clone())
            .with_top_k(settings.retrieval.top_k)
            .with_min_score(settings.retrieval.min_score);
        let synthesizer = AnswerSynthesizer::new(generator)
            .with_prompts(prompts)
            .with_timeout(Duration::from_secs(settings.rag.generation_timeout_secs));

        Ok(Self {
            settings,
            embedder,
            vector_store,
            retriever,
            synthesizer,
            state: None,
        })
    }

    /// The loaded index, if [`initialize`](Self::initialize) has run.
    pub fn index(&self) -> Option<&IndexState> {
        self.state.as_ref()
    }

    /// Load the persisted index, or build and persist a fresh one.
    ///
    /// A missing or incompatible index is rebuilt; `force` always rebuilds.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self, force: bool) -> Result<IndexReport> {
        let records = corpus::load(&self.settings.corpus_path(), self.settings.corpus.max_documents)?;
        let chunking_key = serde_json::to_string(&self.settings.chunking)?;
        let fingerprint = corpus::fingerprint(&records, &chunking_key);

        let expectation = IndexExpectation {
            dimensions: self.embedder.dimensions(),
            embedding_model: self.embedder.model_id(),
            metric: self.settings.vector_store.metric,
            corpus_fingerprint: Some(fingerprint.clone()),
        };

        if !force {
            match self.vector_store.load(&expectation) {
                Ok(state) => {
                    info!(
                        "Reusing index at {} ({} chunks)",
                        self.vector_store.location(),
                        state.len()
                    );
                    let report = IndexReport::new(&state, false);
                    self.state = Some(state);
                    return Ok(report);
                }
                Err(e) if e.requires_rebuild() => {
                    warn!("Rebuilding index: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let chunker = create_chunker(self.settings.chunking.strategy);
        let chunks = chunk_all(chunker.as_ref(), &records, &self.settings.chunking.to_config());
        info!("Split {} movies into {} chunks", records.len(), chunks.len());

        let state = vector_store::build(
            chunks,
            &records,
            self.embedder.as_ref(),
            self.settings.vector_store.metric,
            fingerprint,
        )
        .await?;
        self.vector_store.save(&state)?;
        info!("Saved index to {}", self.vector_store.location());

        let report = IndexReport::new(&state, true);
        self.state = Some(state);
        Ok(report)
    }

    /// Answer a question from the default `top_k` chunks.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        self.query_with_progress(question, None, &mut |_| {}).await
    }

    /// Answer a question from `k` (default `top_k`) chunks, reporting each
    /// pipeline stage to `on_stage`.
    ///
    /// Invalid input and embedding failures are errors; generation failures
    /// produce a degraded result instead.
    #[instrument(skip(self, on_stage), fields(question = %question))]
    pub async fn query_with_progress(
        &self,
        question: &str,
        k: Option<usize>,
        on_stage: &mut (dyn FnMut(QueryStage) + Send),
    ) -> Result<QueryResult> {
        let state = self.loaded_state()?;
        let k = self.retriever.resolve_k(state, k)?;

        on_stage(QueryStage::Embedding);
        let vector = self.retriever.embed_query(question).await?;

        on_stage(QueryStage::Searching);
        let retrieved = self.retriever.retrieve_by_vector(state, &vector, k)?;

        Ok(self
            .synthesizer
            .answer_with_progress(question.trim(), &retrieved, on_stage)
            .await)
    }

    /// Retrieve the `k` (default `top_k`) most relevant chunks without generating.
    pub async fn search(&self, question: &str, k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let state = self.loaded_state()?;
        self.retriever.retrieve(state, question, k).await
    }

    fn loaded_state(&self) -> Result<&IndexState> {
        self.state.as_ref().ok_or_else(|| {
            PlotlineError::VectorStore("index is not initialized".to_string())
        })
    }
}

/// Summary of [`Orchestrator::initialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub chunks: usize,
    pub movies: usize,
    /// Whether the index was built in this run rather than loaded.
    pub rebuilt: bool,
}

impl IndexReport {
    fn new(state: &IndexState, rebuilt: bool) -> Self {
        Self {
            chunks: state.len(),
            movies: state.records().count(),
            rebuilt,
        }
    }
}
