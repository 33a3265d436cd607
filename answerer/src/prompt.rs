//! Prompt templates: grounded answering and quiz generation.

use vector_store::ScoredChunk;

/// Upper bound on context characters fed to the model.
const MAX_CONTEXT_CHARS: usize = 12_000;

/// Builds the grounded answer prompt from retrieved chunks.
///
/// The instructions pin the model to the supplied context: if the answer is
/// not there, it must say so explicitly instead of guessing.
pub fn build_answer_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    let context = join_context(hits.iter().map(|h| h.chunk.text.as_str()));

    format!(
        r#"You are an intelligent assistant trained to answer questions based on the provided document contents.

Instructions:
- Use ONLY the context from the document to answer.
- Always format your answers in a clean, structured way using bullet points, numbered lists, or headings.
- If the answer is not in the context, respond with: "The answer is not available in the provided content."
- Be concise and accurate.

Context from document:
{context}

Question:
{question}

Answer:
"#
    )
}

/// Builds the quiz-generation prompt over a document's full chunk set.
///
/// The reply format is pinned to a JSON array so the output can be parsed
/// as data; it is never evaluated as anything else.
pub fn build_quiz_prompt(chunk_texts: &[&str]) -> String {
    let context = join_context(chunk_texts.iter().copied());

    format!(
        r#"You are a study assistant. Based on the document below, write between 5 and 10 self-check questions.

Reply with ONLY a JSON array, no prose and no code fences. Each element must be an object with exactly two fields:
- "question": the question text
- "type": one of "multiple-choice", "short-answer", "true-false"

Document:
{context}
"#
    )
}

/// Joins chunk texts with separators under the context budget, preserving
/// order and cutting at a char boundary when the budget runs out.
fn join_context<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        if out.len() + part.len() > MAX_CONTEXT_CHARS {
            let take = MAX_CONTEXT_CHARS.saturating_sub(out.len());
            out.push_str(safe_truncate(part, take));
            break;
        }
        out.push_str(part);
    }
    out
}

fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_prompt_contains_context_and_question() {
        let hits = vec![ScoredChunk {
            chunk: doc_ingest::Chunk {
                text: "The cell membrane is selectively permeable.".into(),
                source_offset: 0,
                source_doc_id: "doc".into(),
            },
            score: 0.9,
        }];
        let p = build_answer_prompt("What is the membrane?", &hits);
        assert!(p.contains("selectively permeable"));
        assert!(p.contains("What is the membrane?"));
        assert!(p.contains("Use ONLY the context"));
    }

    #[test]
    fn context_budget_is_respected() {
        let big = "x".repeat(20_000);
        let p = build_quiz_prompt(&[big.as_str()]);
        assert!(p.len() < 21_000);
    }

    #[test]
    fn safe_truncate_respects_char_boundaries() {
        let s = "ééééé";
        let t = safe_truncate(s, 3);
        assert_eq!(t, "é");
    }
}
