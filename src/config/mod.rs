//! Configuration module for Plotline.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, CorpusSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings,
    PromptSettings, RagSettings, RetrievalSettings, Settings, VectorStoreProvider,
    VectorStoreSettings,
};
