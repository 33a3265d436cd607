//! Grounded answering and quiz generation on top of the vector store.
//!
//! Two public operations:
//! - [`answer`]: retrieves top-k chunks for a question, builds a strictly
//!   grounded prompt and calls the generation capability once. With no index
//!   available it degrades (deliberately) to a direct ungrounded call.
//! - [`generate_quiz`]: asks the model for a self-check quiz over a
//!   document's chunks and defensively parses the reply; quiz generation is
//!   best-effort and never fails the pipeline.

mod answer;
mod error;
mod generator;
mod prompt;
mod quiz;

pub use answer::{Answer, answer};
pub use error::AnswerError;
pub use generator::TextGenerator;
pub use quiz::{QuizKind, QuizQuestion, generate_quiz};
