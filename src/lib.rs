//! Plotline - Movie plot question answering
//!
//! A local-first CLI tool and library that answers natural-language questions
//! about movie plots with retrieval-augmented generation.
//!
//! # Overview
//!
//! Plotline allows you to:
//! - Load a JSON corpus of movie plots
//! - Split plots into overlapping chunks and embed them
//! - Persist the vector index and reuse it while the corpus is unchanged
//! - Retrieve the most relevant plot chunks for a question
//! - Generate a grounded answer, falling back to the retrieved excerpts when
//!   the model is unavailable
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `corpus` - Movie corpus loading
//! - `chunking` - Plot chunking strategies
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index and its persistence
//! - `retrieval` - Top-K retrieval
//! - `rag` - Answer synthesis
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use plotline::config::Settings;
//! use plotline::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.initialize(false).await?;
//!     println!("{} chunks from {} movies", report.chunks, report.movies);
//!
//!     let result = orchestrator.query("Which movies feature simulated reality?").await?;
//!     println!("{}", result.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod vector_store;

pub use error::{PlotlineError, Result};
