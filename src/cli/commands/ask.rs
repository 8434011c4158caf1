//! Ask command implementation.

use super::index::open_index;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};

/// Run the ask command.
pub async fn run_ask(
    questions: &[String],
    top_k: Option<usize>,
    save_dir: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    if settings.rag.enabled && !preflight::generation_available(&settings) {
        Output::warning("OPENAI_API_KEY not set; answers will fall back to retrieved plot excerpts.");
    }

    let (orchestrator, _) = open_index(settings, false).await?;

    for (i, question) in questions.iter().enumerate() {
        answer_question(&orchestrator, question, top_k, i + 1, save_dir.as_deref()).await?;
    }

    if let Some(dir) = &save_dir {
        Output::success(&format!(
            "Processed {} queries. Results saved in {}",
            questions.len(),
            dir.display()
        ));
    }

    Ok(())
}

/// Answer one question from `top_k` (default from settings) chunks, print it
/// and optionally save it as `query_NN.json`.
pub(crate) async fn answer_question(
    orchestrator: &Orchestrator,
    question: &str,
    top_k: Option<usize>,
    number: usize,
    save_dir: Option<&Path>,
) -> Result<()> {
    println!("\n{} {}", style(format!("{}. Query:", number)).bold(), question);

    let spinner = Output::spinner("Embedding question...");
    let progress = spinner.clone();
    let result = orchestrator
        .query_with_progress(question, top_k, &mut |stage| progress.set_message(stage.describe()))
        .await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Query failed: {}", e));
            return Err(e.into());
        }
    };

    if result.is_degraded() {
        Output::warning("Answer generation failed; showing retrieved plot excerpts.");
    }
    Output::query_result(&result);

    if let Some(dir) = save_dir {
        let path = dir.join(format!("query_{:02}.json", number));
        result.write_json(&path)?;
        Output::kv("Saved to", &path.display().to_string());
    }

    Ok(())
}
