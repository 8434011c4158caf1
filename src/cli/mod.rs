//! CLI module for Plotline.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Plotline - Movie plot question answering
///
/// Indexes a corpus of movie plots and answers questions about them with
/// retrieval-augmented generation.
#[derive(Parser, Debug)]
#[command(name = "plotline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the plot index, or reuse the persisted one when it is current
    Index {
        /// Rebuild even if a compatible index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Ask one or more questions about the movie plots
    Ask {
        /// The questions to ask
        #[arg(required = true)]
        questions: Vec<String>,

        /// Number of plot chunks to retrieve per question
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Directory where each result is saved as query_NN.json
        #[arg(short, long, default_value = "results")]
        save_dir: String,

        /// Do not save results
        #[arg(long)]
        no_save: bool,
    },

    /// Search for relevant plot chunks without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive question session
    Chat {
        /// Directory where each result is saved as query_NN.json
        #[arg(short, long)]
        save_dir: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_options() {
        let cli = Cli::try_parse_from([
            "plotline",
            "-vv",
            "ask",
            "Which movies feature simulated reality?",
            "Who is Nemo?",
            "-k",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                questions,
                top_k,
                save_dir,
                no_save,
            } => {
                assert_eq!(questions.len(), 2);
                assert_eq!(top_k, Some(5));
                assert_eq!(save_dir, "results");
                assert!(!no_save);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ask_requires_a_question() {
        assert!(Cli::try_parse_from(["plotline", "ask"]).is_err());
    }

    #[test]
    fn test_parse_index_force_and_global_config() {
        let cli = Cli::try_parse_from(["plotline", "index", "--force", "-c", "custom.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert!(matches!(cli.command, Commands::Index { force: true }));
    }
}
