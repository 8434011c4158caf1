//! Index command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{IndexReport, Orchestrator};
use anyhow::Result;

/// Run the index command.
pub async fn run_index(force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let index_dir = settings.index_dir();
    let (_, report) = open_index(settings, force).await?;

    if report.rebuilt {
        Output::success(&format!(
            "Indexed {} chunks from {} movies",
            report.chunks, report.movies
        ));
    } else {
        Output::success(&format!(
            "Index is up to date ({} chunks from {} movies)",
            report.chunks, report.movies
        ));
    }
    Output::kv("Index", &index_dir.display().to_string());

    Ok(())
}

/// Create an orchestrator and load or build its index behind a spinner.
pub(crate) async fn open_index(settings: Settings, force: bool) -> Result<(Orchestrator, IndexReport)> {
    let mut orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Loading movie plot index...");
    let report = orchestrator.initialize(force).await;
    spinner.finish_and_clear();

    match report {
        Ok(report) => Ok((orchestrator, report)),
        Err(e) => {
            Output::error(&format!("Failed to prepare index: {}", e));
            Err(e.into())
        }
    }
}
