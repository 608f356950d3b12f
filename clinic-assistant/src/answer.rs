//! Answer generation for general questions.

use async_trait::async_trait;

use crate::session::ChatMessage;

/// Reply used when no chat model is configured.
pub const UNCONFIGURED_REPLY: &str =
    "I'm sorry, but I'm not fully configured yet (missing API key). Please contact the administrator.";

/// Produces a reply to a free-form question.
///
/// `history` ends with the question itself when the caller has already
/// recorded it. `chunks` is the retrieved context, possibly empty.
/// Implementations turn their own failures into a friendly reply.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate_answer(&self, query: &str, history: &[ChatMessage], chunks: &[String]) -> String;
}

/// Answers without a model: explains that the assistant is not configured,
/// and points at the retrieved context when there is some.
#[derive(Debug, Clone, Default)]
pub struct FallbackAnswerGenerator;

#[async_trait]
impl AnswerGenerator for FallbackAnswerGenerator {
    async fn generate_answer(&self, _query: &str, _history: &[ChatMessage], chunks: &[String]) -> String {
        match chunks.first() {
            None => UNCONFIGURED_REPLY.to_string(),
            Some(best) => format!(
                "{UNCONFIGURED_REPLY}\n\nThis passage from your documents may help:\n\n> {}",
                best.trim()
            ),
        }
    }
}
