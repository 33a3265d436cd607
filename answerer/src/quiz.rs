//! Self-check quiz generation with defensive parsing.
//!
//! The generation output is untrusted text that is *expected* to encode a
//! JSON array of question objects. It is parsed strictly as data — never
//! evaluated — and anything non-conforming degrades to an empty quiz with a
//! warning. Quiz generation is best-effort: it must never fail the upload
//! pipeline.

use doc_ingest::Chunk;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::generator::TextGenerator;
use crate::prompt;

/// Inputs shorter than this are not worth a model call.
const MIN_CONTEXT_CHARS: usize = 40;

/// Question style requested from the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizKind {
    MultipleChoice,
    ShortAnswer,
    TrueFalse,
}

/// One generated self-check question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuizKind,
}

/// Generates a quiz over a document's full chunk set.
///
/// One generation call; the reply must be a JSON array of objects with
/// non-empty `question` and a known `type`. Any generation failure, parse
/// failure or schema mismatch returns an empty list — never an error.
/// Empty or near-empty input short-circuits without calling the model.
pub async fn generate_quiz(
    chunks: &[Chunk],
    generator: &dyn TextGenerator,
) -> Vec<QuizQuestion> {
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let total: usize = texts.iter().map(|t| t.trim().len()).sum();
    if total < MIN_CONTEXT_CHARS {
        debug!("generate_quiz: {} context chars, skipping", total);
        return Vec::new();
    }

    let quiz_prompt = prompt::build_quiz_prompt(&texts);
    let raw = match generator.generate(&quiz_prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("generate_quiz: generation failed, degrading to empty quiz: {e}");
            return Vec::new();
        }
    };

    match parse_quiz(&raw) {
        Ok(questions) => {
            debug!("generate_quiz: parsed {} questions", questions.len());
            questions
        }
        Err(reason) => {
            warn!("generate_quiz: rejected model output ({reason}), degrading to empty quiz");
            Vec::new()
        }
    }
}

/// Parses model output into quiz questions, strictly.
///
/// Tolerates code fences and prose around the array (models add both), but
/// the array itself must deserialize into the exact schema: unknown `type`
/// values, missing fields or empty questions reject the whole quiz.
fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, String> {
    let body = extract_json_array(raw).ok_or("no JSON array in output")?;

    let questions: Vec<QuizQuestion> =
        serde_json::from_str(body).map_err(|e| format!("schema mismatch: {e}"))?;

    if questions.iter().any(|q| q.question.trim().is_empty()) {
        return Err("empty question text".to_string());
    }

    Ok(questions)
}

/// Returns the substring from the first `[` to the last `]`, if any.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AnswerError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::{future::Future, pin::Pin};

    /// Scripted generation double shared by answerer tests.
    pub(crate) struct ScriptedGenerator {
        reply: Option<String>,
        calls: AtomicU32,
        last_prompt: Mutex<String>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(String::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(String::new()),
            }
        }

        pub(crate) fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_prompt(&self) -> String {
            self.last_prompt.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, AnswerError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                *self.last_prompt.lock().unwrap() = prompt.to_string();
                match &self.reply {
                    Some(r) => Ok(r.clone()),
                    None => Err(AnswerError::Generation(llm_gateway::LlmError::Decode(
                        "scripted failure".into(),
                    ))),
                }
            })
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_offset: 0,
            source_doc_id: "doc".into(),
        }
    }

    fn study_chunks() -> Vec<Chunk> {
        vec![chunk(
            "The French Revolution began in 1789 and reshaped European politics \
             through the rise of republicanism and the fall of the monarchy.",
        )]
    }

    #[tokio::test]
    async fn valid_json_array_is_parsed() {
        let generator = ScriptedGenerator::replying(
            r#"[{"question":"When did the revolution begin?","type":"short-answer"},
                {"question":"The monarchy survived. True or false?","type":"true-false"}]"#,
        );
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz[0].kind, QuizKind::ShortAnswer);
        assert_eq!(quiz[1].kind, QuizKind::TrueFalse);
    }

    #[tokio::test]
    async fn code_fenced_output_is_tolerated() {
        let generator = ScriptedGenerator::replying(
            "Here you go:\n```json\n[{\"question\":\"Q?\",\"type\":\"multiple-choice\"}]\n```",
        );
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].kind, QuizKind::MultipleChoice);
    }

    #[tokio::test]
    async fn non_list_output_degrades_to_empty() {
        let generator = ScriptedGenerator::replying("I cannot produce a quiz for this.");
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert!(quiz.is_empty());
    }

    #[tokio::test]
    async fn unknown_question_type_rejects_the_quiz() {
        let generator = ScriptedGenerator::replying(
            r#"[{"question":"Q?","type":"essay"}]"#,
        );
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert!(quiz.is_empty());
    }

    #[tokio::test]
    async fn wrong_element_shape_rejects_the_quiz() {
        let generator = ScriptedGenerator::replying(r#"["just", "strings"]"#);
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert!(quiz.is_empty());
    }

    #[tokio::test]
    async fn near_empty_input_skips_the_model_entirely() {
        let generator = ScriptedGenerator::replying("[]");
        let quiz = generate_quiz(&[chunk("   hi   ")], &generator).await;
        assert!(quiz.is_empty());
        assert_eq!(generator.call_count(), 0);

        let quiz = generate_quiz(&[], &generator).await;
        assert!(quiz.is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_degrades_to_empty() {
        let generator = ScriptedGenerator::failing();
        let quiz = generate_quiz(&study_chunks(), &generator).await;
        assert!(quiz.is_empty());
    }

    #[test]
    fn extract_json_array_bounds() {
        assert_eq!(extract_json_array("x [1,2] y"), Some("[1,2]"));
        assert_eq!(extract_json_array("no array"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }
}
