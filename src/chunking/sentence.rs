//! Sentence-aligned chunking.
//!
//! Packs whole sentences into chunks of up to `chunk_size` words and carries
//! the last sentences of a full chunk into the next one so that narrative
//! context survives the cut.

use super::{chunks_from_ranges, merge_short_tail, Chunk, Chunker, ChunkingConfig};
use crate::corpus::MovieRecord;
use std::ops::Range;

/// Sentences carried over from a full chunk into the next one.
const OVERLAP_SENTENCES: usize = 2;

/// Sentence-aware chunker.
pub struct SentenceChunker;

impl SentenceChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, record: &MovieRecord, config: &ChunkingConfig) -> Vec<Chunk> {
        let words: Vec<&str> = record.plot.split_whitespace().collect();
        let size = config.chunk_size.max(1);

        if words.len() <= size {
            return chunks_from_ranges(record, &words, vec![0..words.len()]);
        }

        let mut ranges = pack_sentences(&sentence_ranges(&words), size);
        merge_short_tail(&mut ranges, config.min_chunk_words);
        chunks_from_ranges(record, &words, ranges)
    }
}

/// Split words into sentence ranges. A trailing unterminated sentence is kept.
fn sentence_ranges(words: &[&str]) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, word) in words.iter().enumerate() {
        if ends_sentence(word) {
            sentences.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < words.len() {
        sentences.push(start..words.len());
    }
    sentences
}

fn ends_sentence(word: &str) -> bool {
    let word = word.trim_end_matches(['"', '\'', ')', ']']);
    word.ends_with(['.', '!', '?'])
}

fn pack_sentences(sentences: &[Range<usize>], size: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut current: Vec<Range<usize>> = Vec::new();

    for sentence in sentences {
        let current_len = span_len(&current);
        if !current.is_empty() && current_len + sentence.len() > size {
            ranges.push(span(&current));

            // Never carry the whole chunk, and only carry what still fits.
            let keep = OVERLAP_SENTENCES.min(current.len() - 1);
            let mut carried: Vec<Range<usize>> = current.split_off(current.len() - keep);
            while !carried.is_empty() && span_len(&carried) + sentence.len() > size {
                carried.remove(0);
            }
            current = carried;
        }
        current.push(sentence.clone());
    }

    if !current.is_empty() {
        ranges.push(span(&current));
    }
    ranges
}

fn span(sentences: &[Range<usize>]) -> Range<usize> {
    match (sentences.first(), sentences.last()) {
        (Some(first), Some(last)) => first.start..last.end,
        _ => 0..0,
    }
}

fn span_len(sentences: &[Range<usize>]) -> usize {
    span(sentences).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::test_support::assert_covers;

    fn record(plot: &str) -> MovieRecord {
        MovieRecord {
            id: 3,
            title: "Sentences".to_string(),
            year: None,
            genres: Vec::new(),
            plot: plot.to_string(),
        }
    }

    /// `count` sentences of `len` words each.
    fn plot_of(count: usize, len: usize) -> String {
        (0..count)
            .map(|s| {
                let mut words: Vec<String> = (0..len).map(|w| format!("s{}w{}", s, w)).collect();
                if let Some(last) = words.last_mut() {
                    last.push('.');
                }
                words.join(" ")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn config(size: usize, min: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: size,
            chunk_overlap: 0,
            min_chunk_words: min,
        }
    }

    #[test]
    fn test_sentence_boundaries() {
        let words: Vec<&str> = "He runs. She hides! \"Why?\" they ask (quietly.) Then".split_whitespace().collect();
        let sentences = sentence_ranges(&words);
        assert_eq!(sentences, vec![0..2, 2..4, 4..5, 5..8, 8..9]);
    }

    #[test]
    fn test_short_plot_single_chunk() {
        let chunks = SentenceChunker::new().chunk(&record("One. Two. Three."), &config(300, 50));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_range, (0, 3));
        assert_eq!(chunks[0].text, "Movie: Sentences. Year: Unknown. Plot: One. Two. Three.");
    }

    #[test]
    fn test_chunks_align_to_sentences_with_overlap() {
        // Ten sentences of ten words, chunks of at most forty words.
        let plot = plot_of(10, 10);
        let chunks = SentenceChunker::new().chunk(&record(&plot), &config(40, 5));

        assert_covers(&chunks, 100);
        for chunk in &chunks {
            assert_eq!(chunk.word_range.0 % 10, 0, "chunk starts mid-sentence");
            assert!(chunk.plot_word_count() <= 40);
        }
        // Two sentences of overlap between consecutive chunks.
        assert_eq!(chunks[0].word_range, (0, 40));
        assert_eq!(chunks[1].word_range, (20, 60));
    }

    #[test]
    fn test_long_sentence_is_its_own_chunk() {
        let plot = format!("{} {}", plot_of(1, 50), plot_of(2, 5));
        let chunks = SentenceChunker::new().chunk(&record(&plot), &config(20, 1));

        assert_covers(&chunks, 60);
        assert_eq!(chunks[0].word_range, (0, 50));
        assert_eq!(chunks[1].word_range, (50, 60));
    }

    #[test]
    fn test_short_tail_merged() {
        // 45 words: a 40-word chunk, then a 5-word remainder below the minimum.
        let plot = format!("{} {}", plot_of(4, 10), plot_of(1, 5));
        let chunks = SentenceChunker::new().chunk(&record(&plot), &config(40, 10));

        assert_covers(&chunks, 45);
        assert_eq!(chunks.last().unwrap().word_range.1, 45);
        assert!(chunks.iter().all(|c| c.word_range != (40, 45)));
    }
}
