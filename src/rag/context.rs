//! Context formatting for RAG prompts.

use crate::retrieval::RetrievedChunk;

/// Format retrieved chunks for inclusion in a prompt.
///
/// Chunks are numbered in retrieval order. The text already carries the
/// movie title and year from chunking.
pub fn format_context_for_prompt(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, retrieved)| format!("[{}] {}", i + 1, retrieved.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::{chunk, record};

    fn retrieved(record_id: u32, title: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: chunk(record_id, 0, text),
            record: record(record_id, title),
            distance: 0.1,
            score: 0.9,
        }
    }

    #[test]
    fn test_prompt_context_is_numbered_in_order() {
        let chunks = vec![
            retrieved(1, "Alpha", "first text"),
            retrieved(2, "Beta", "second text"),
        ];
        let context = format_context_for_prompt(&chunks);
        assert_eq!(context, "[1] first text\n\n[2] second text");
    }
}
