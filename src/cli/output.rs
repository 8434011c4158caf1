//! CLI output formatting utilities.

use crate::rag::QueryResult;
use crate::retrieval::RetrievedChunk;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a retrieved chunk.
    pub fn search_result(rank: usize, result: &RetrievedChunk) {
        println!(
            "\n{} {} {} ({}) [{}] (score: {:.2})",
            style(format!("{}.", rank)).green(),
            style(&result.record.title).bold(),
            style(result.record.display_year()).cyan(),
            result.record.genres.join(", "),
            style(&result.chunk.chunk_id).dim(),
            result.score
        );
        println!("   {}", content_preview(&result.chunk.text, 200));
    }

    /// Print a query result.
    pub fn query_result(result: &QueryResult) {
        let label = if result.is_degraded() {
            style("Answer:").yellow().bold()
        } else {
            style("Answer:").green().bold()
        };
        println!("\n{} {}", label, result.answer);
        println!("\n{} {}", style("Reasoning:").cyan().bold(), result.reasoning);

        if !result.contexts.is_empty() {
            Output::header(&format!("Retrieved {} context chunks", result.contexts.len()));
            for (i, context) in result.contexts.iter().enumerate() {
                println!("  {} {}", style(format!("[{}]", i + 1)).dim(), content_preview(context, 200));
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}
