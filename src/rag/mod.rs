//! RAG (Retrieval-Augmented Generation) answer synthesis.
//!
//! Turns retrieved plot chunks and a question into a [`QueryResult`]. Failures
//! of the generative model never escape: they produce a degraded result that
//! still carries the retrieved contexts.

pub mod context;
mod generator;
mod parser;
mod response;

pub use generator::{create_generator, Generator, OpenAIGenerator};
pub use parser::{ParsedResponse, ResponseParser, SectionParser};
pub use response::AnswerSynthesizer;

#[cfg(test)]
pub(crate) use response::test_support;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Answer used when the generative model could not produce one.
pub const UNABLE_TO_GENERATE: &str =
    "Unable to generate an answer right now. The most relevant plot excerpts are included below.";

/// Answer used when retrieval found nothing to ground an answer in.
pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find relevant information about this topic in the movie plots database.";

/// The outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    /// Retrieved chunk texts, most relevant first.
    pub contexts: Vec<String>,
    pub reasoning: String,
}

impl QueryResult {
    /// Whether this result came from the degrade-gracefully path.
    pub fn is_degraded(&self) -> bool {
        self.answer == UNABLE_TO_GENERATE
    }

    /// Write the result as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Per-query pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Idle,
    Embedding,
    Searching,
    PromptBuilding,
    Generating,
    Done,
    /// Generation failed; a degraded result is still produced.
    Failed,
}

impl QueryStage {
    /// Short progress message for this stage.
    pub fn describe(&self) -> &'static str {
        match self {
            QueryStage::Idle => "Waiting...",
            QueryStage::Embedding => "Embedding question...",
            QueryStage::Searching => "Searching movie plots...",
            QueryStage::PromptBuilding => "Building prompt...",
            QueryStage::Generating => "Generating answer...",
            QueryStage::Done => "Done",
            QueryStage::Failed => "Generation failed, using retrieved excerpts",
        }
    }

    /// Whether the query has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryStage::Done | QueryStage::Failed)
    }
}
