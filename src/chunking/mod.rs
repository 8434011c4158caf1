//! Plot chunking strategies for breaking movie plots into searchable segments.
//!
//! Every chunk carries a metadata prefix (title, year, genres) so that its
//! embedding captures which movie it belongs to, not only what happens in it.

mod sentence;
mod window;

pub use sentence::SentenceChunker;
pub use window::WindowChunker;

use crate::corpus::MovieRecord;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A slice of a movie plot, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Corpus-unique ID, `"{record_id}#{ordinal}"`.
    pub chunk_id: String,
    /// ID of the movie this chunk was cut from.
    pub parent_record_id: u32,
    /// Metadata prefix followed by the plot words in `word_range`.
    pub text: String,
    /// Half-open range of plot word indices covered by this chunk.
    pub word_range: (usize, usize),
}

impl Chunk {
    /// Build a chunk from a record and a range of its plot words.
    pub fn from_words(record: &MovieRecord, ordinal: usize, words: &[&str], range: Range<usize>) -> Self {
        let mut text = metadata_prefix(record);
        text.push_str(&words[range.clone()].join(" "));

        Self {
            chunk_id: format!("{}#{}", record.id, ordinal),
            parent_record_id: record.id,
            text: text.trim_end().to_string(),
            word_range: (range.start, range.end),
        }
    }

    /// Number of plot words in this chunk (excluding the metadata prefix).
    pub fn plot_word_count(&self) -> usize {
        self.word_range.1 - self.word_range.0
    }
}

/// Structured prefix prepended to every chunk text.
pub fn metadata_prefix(record: &MovieRecord) -> String {
    let mut prefix = format!("Movie: {}. Year: {}. ", record.title, record.display_year());
    if !record.genres.is_empty() {
        prefix.push_str(&format!("Genres: {}. ", record.genres.join(", ")));
    }
    prefix.push_str("Plot: ");
    prefix
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Fixed word-count windows.
    #[default]
    Window,
    /// Sentence-aligned packing.
    Sentence,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "window" | "fixed" => Ok(ChunkingStrategy::Window),
            "sentence" | "smart" => Ok(ChunkingStrategy::Sentence),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target words per chunk.
    pub chunk_size: usize,
    /// Words shared by consecutive windows (window strategy).
    pub chunk_overlap: usize,
    /// Minimum fresh words for a trailing chunk to stand on its own.
    pub min_chunk_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            min_chunk_words: 50,
        }
    }
}

/// Trait for plot chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split a movie's plot into ordered chunks. Always yields at least one chunk.
    fn chunk(&self, record: &MovieRecord, config: &ChunkingConfig) -> Vec<Chunk>;
}

/// Create a chunker based on the strategy.
pub fn create_chunker(strategy: ChunkingStrategy) -> Box<dyn Chunker> {
    match strategy {
        ChunkingStrategy::Window => Box::new(WindowChunker::new()),
        ChunkingStrategy::Sentence => Box::new(SentenceChunker::new()),
    }
}

/// Chunk a whole corpus, preserving record order.
pub fn chunk_all(chunker: &dyn Chunker, records: &[MovieRecord], config: &ChunkingConfig) -> Vec<Chunk> {
    records
        .iter()
        .flat_map(|record| chunker.chunk(record, config))
        .collect()
}

/// Turn word ranges into chunks for one record.
fn chunks_from_ranges(record: &MovieRecord, words: &[&str], ranges: Vec<Range<usize>>) -> Vec<Chunk> {
    ranges
        .into_iter()
        .enumerate()
        .map(|(ordinal, range)| Chunk::from_words(record, ordinal, words, range))
        .collect()
}

/// Fold a trailing range into its predecessor when it adds fewer than
/// `min_fresh` words the predecessor does not already cover.
fn merge_short_tail(ranges: &mut Vec<Range<usize>>, min_fresh: usize) {
    if ranges.len() < 2 {
        return;
    }
    let last = ranges[ranges.len() - 1].clone();
    let prev_end = ranges[ranges.len() - 2].end;
    if last.end.saturating_sub(prev_end) < min_fresh {
        ranges.pop();
        if let Some(prev) = ranges.last_mut() {
            prev.end = last.end;
        }
    }
}
