//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{PlotlineError, Result};

/// Run pre-flight checks for any command that embeds text.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
/// A missing generator key is not an error: answers degrade to the retrieved
/// excerpts, see [`generation_available`].
pub fn check(settings: &Settings) -> Result<()> {
    if settings.embedding.provider == EmbeddingProvider::OpenAI {
        check_api_key(api_key().as_deref())?;
    }
    Ok(())
}

/// Whether answers can be generated rather than degraded.
pub fn generation_available(settings: &Settings) -> bool {
    settings.rag.enabled && check_api_key(api_key().as_deref()).is_ok()
}

fn api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok()
}

/// Check if OpenAI API key is configured.
fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(PlotlineError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(PlotlineError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
