//! Fixed-size word window chunking.

use super::{chunks_from_ranges, merge_short_tail, Chunk, Chunker, ChunkingConfig};
use crate::corpus::MovieRecord;
use std::ops::Range;

/// Word-window chunker.
///
/// Cuts the plot into windows of `chunk_size` words that advance by
/// `chunk_size - chunk_overlap`. A short trailing window is merged into the
/// one before it.
pub struct WindowChunker;

impl WindowChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, record: &MovieRecord, config: &ChunkingConfig) -> Vec<Chunk> {
        let words: Vec<&str> = record.plot.split_whitespace().collect();
        let ranges = window_ranges(words.len(), config);
        chunks_from_ranges(record, &words, ranges)
    }
}

fn window_ranges(word_count: usize, config: &ChunkingConfig) -> Vec<Range<usize>> {
    let size = config.chunk_size.max(1);
    if word_count <= size {
        return vec![0..word_count];
    }

    let overlap = config.chunk_overlap.min(size - 1);
    let step = size - overlap;

    let mut ranges = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(word_count);
        ranges.push(start..end);
        if end == word_count {
            break;
        }
        start += step;
    }

    merge_short_tail(&mut ranges, config.min_chunk_words);
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::test_support::{assert_covers, record_with_words};

    fn config(size: usize, overlap: usize, min: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            min_chunk_words: min,
        }
    }

    #[test]
    fn test_short_plot_single_chunk() {
        let record = record_with_words(40);
        let chunks = WindowChunker::new().chunk(&record, &ChunkingConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_range, (0, 40));
        assert_eq!(chunks[0].chunk_id, "7#0");
        assert!(chunks[0].text.starts_with("Movie: Numbers. Year: 2001."));
        assert!(chunks[0].text.ends_with("w39"));
    }

    #[test]
    fn test_empty_plot_still_yields_one_chunk() {
        let record = record_with_words(0);
        let chunks = WindowChunker::new().chunk(&record, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_range, (0, 0));
        assert_eq!(chunks[0].plot_word_count(), 0);
    }

    #[test]
    fn test_non_overlapping_windows() {
        let record = record_with_words(250);
        let chunks = WindowChunker::new().chunk(&record, &config(100, 0, 10));

        let ranges: Vec<_> = chunks.iter().map(|c| c.word_range).collect();
        assert_eq!(ranges, vec![(0, 100), (100, 200), (200, 250)]);
        assert_covers(&chunks, 250);
    }

    #[test]
    fn test_overlapping_windows() {
        let record = record_with_words(700);
        let chunks = WindowChunker::new().chunk(&record, &ChunkingConfig::default());

        let ranges: Vec<_> = chunks.iter().map(|c| c.word_range).collect();
        assert_eq!(ranges, vec![(0, 300), (250, 550), (500, 700)]);
        assert_covers(&chunks, 700);
    }

    #[test]
    fn test_tiny_tail_merged_into_previous() {
        let record = record_with_words(310);
        let chunks = WindowChunker::new().chunk(&record, &ChunkingConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_range, (0, 310));
        assert!(chunks[0].text.ends_with("w309"));

        let record = record_with_words(205);
        let chunks = WindowChunker::new().chunk(&record, &config(100, 0, 10));
        let ranges: Vec<_> = chunks.iter().map(|c| c.word_range).collect();
        assert_eq!(ranges, vec![(0, 100), (100, 205)]);
    }

    #[test]
    fn test_excess_overlap_is_clamped() {
        let record = record_with_words(30);
        let chunks = WindowChunker::new().chunk(&record, &config(10, 25, 0));
        assert_covers(&chunks, 30);
        assert_eq!(chunks.len(), 21);
    }

    #[test]
    fn test_word_total_within_window_budget() {
        let cfg = ChunkingConfig::default();
        for n in [1, 299, 300, 350, 351, 999, 1234] {
            let record = record_with_words(n);
            let chunks = WindowChunker::new().chunk(&record, &cfg);
            assert_covers(&chunks, n);

            let total: usize = chunks.iter().map(Chunk::plot_word_count).sum();
            assert!(total >= n, "chunking dropped words for n={}", n);
            assert!(total <= cfg.chunk_size * chunks.len(), "n={}", n);
            assert!(chunks.iter().all(|c| c.plot_word_count() <= cfg.chunk_size));
        }
    }

    #[test]
    fn test_merged_tail_bound() {
        let cfg = ChunkingConfig::default();
        for n in [301, 349, 849] {
            let record = record_with_words(n);
            let chunks = WindowChunker::new().chunk(&record, &cfg);
            assert_covers(&chunks, n);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.plot_word_count() <= cfg.chunk_size));
            assert!(last.plot_word_count() > cfg.chunk_size, "n={} should merge", n);
            assert!(last.plot_word_count() <= cfg.chunk_size + cfg.min_chunk_words - 1);
        }
    }
}
