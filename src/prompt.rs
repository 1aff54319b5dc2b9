//! Grounded prompt assembly and citation formatting.

use crate::chunks::{Citation, RetrievedChunk};

/// Renders retrieved chunks as labeled context blocks separated by blank lines.
pub fn render_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|r| format!("[{} | {}]\n{}", r.chunk.id, r.chunk.title, r.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wraps the retrieved context in an instruction to answer from it alone.
pub fn build_prompt(retrieved: &[RetrievedChunk], question: &str) -> String {
    let context = render_context(retrieved);
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {question}\n\
         Answer:"
    )
}

/// Citations in retrieval order with a truncated text preview.
pub fn format_citations(retrieved: &[RetrievedChunk]) -> Vec<Citation> {
    retrieved.iter().map(Citation::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{Chunk, PREVIEW_CHARS};
    use pretty_assertions::assert_eq;

    fn retrieved(doc: &str, seq: usize, text: &str, distance: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk::new(doc, &format!("{doc}.md"), seq, text),
            distance,
        }
    }

    #[test]
    fn prompt_embeds_context_and_question() {
        let hits = vec![
            retrieved("a", 0, "Alpha text.", 0.1),
            retrieved("b", 2, "Beta text.", 0.4),
        ];
        let prompt = build_prompt(&hits, "What is alpha?");
        let expected = "Context information is below.\n\
                        ---------------------\n\
                        [a_0 | a.md]\nAlpha text.\n\n[b_2 | b.md]\nBeta text.\n\
                        ---------------------\n\
                        Given the context information and not prior knowledge, answer the query.\n\
                        Query: What is alpha?\n\
                        Answer:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn prompt_is_deterministic_and_preserves_order() {
        let hits = vec![retrieved("z", 0, "last", 0.9), retrieved("a", 0, "first", 1.0)];
        let prompt = build_prompt(&hits, "q");
        assert_eq!(prompt, build_prompt(&hits, "q"));
        assert!(prompt.find("[z_0").unwrap() < prompt.find("[a_0").unwrap());
    }

    #[test]
    fn citations_truncate_preview_by_characters() {
        let long = "é".repeat(PREVIEW_CHARS + 60);
        let hits = vec![retrieved("a", 0, &long, 0.25), retrieved("b", 0, "tiny", 1.5)];
        let citations = format_citations(&hits);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].preview.chars().count(), PREVIEW_CHARS);
        assert_eq!(citations[0].chunk_id, "a_0");
        assert_eq!(citations[0].distance, 0.25);
        assert_eq!(citations[1].preview, "tiny");
        assert_eq!(citations[1].title, "b.md");
    }
}
