//! Interactive question session.

use super::ask::answer_question;
use super::index::open_index;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Questions asked when the session ends before any were entered.
const SAMPLE_QUESTIONS: &[&str] = &[
    "Which movies feature artificial intelligence or robots?",
    "Tell me about movies that involve dreams or virtual reality",
    "What are some good sci-fi movies from the 1990s?",
    "Find movies with prison escape plots",
    "Movies about technology or computers",
    "Which films have superheroes or superpowers?",
    "Romantic comedies from the 2000s",
];

/// Run the interactive chat command.
pub async fn run_chat(save_dir: Option<PathBuf>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    if settings.rag.enabled && !preflight::generation_available(&settings) {
        Output::warning("OPENAI_API_KEY not set; answers will fall back to retrieved plot excerpts.");
    }

    let (orchestrator, report) = open_index(settings, false).await?;

    println!("\n{}", style("Plotline Chat").bold().cyan());
    println!(
        "{}\n",
        style(format!(
            "{} movies indexed. Ask a question, or press Enter / type 'exit' to quit.",
            report.movies
        ))
        .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut asked = 0;

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        asked += 1;
        // Query errors end only this question, not the session.
        if let Err(e) = answer_question(&orchestrator, input, None, asked, save_dir.as_deref()).await {
            tracing::debug!("Question {} failed: {}", asked, e);
        }
        println!();
    }

    if asked == 0 {
        Output::info("No questions entered, running the sample questions.");
        for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
            answer_question(&orchestrator, question, None, i + 1, save_dir.as_deref()).await?;
        }
        asked = SAMPLE_QUESTIONS.len();
    }

    Output::info(&format!("Goodbye! Answered {} questions.", asked));
    Ok(())
}
