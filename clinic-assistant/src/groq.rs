//! Answers from an OpenAI-compatible `/chat/completions` endpoint, such as
//! Groq's.
//!
//! This module is only available when the `groq` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::answer::AnswerGenerator;
use crate::config::{ChatSettings, DEFAULT_CHAT_BASE_URL, DEFAULT_CHAT_MODEL};
use crate::error::{AssistantError, Result};
use crate::session::ChatMessage;

/// Messages of history sent along with a question.
pub const HISTORY_WINDOW: usize = 10;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

const SYSTEM_PROMPT: &str = "You are a knowledgeable and empathetic Dental Healthcare Assistant for 'Smiles Dental Care'. \
Your primary role is to assist patients with dental queries, explain procedures, and provide post-care advice based on the provided context. \
You also help patients book appointments. If a user expresses intent to book, guide them clearly or acknowledge it so the booking system can take over. \
Always be professional, reassuring, and concise. \
If the user asks about something not in the context, use your general dental knowledge but clarify that it is general advice.";

const API_FAILURE_REPLY: &str = "I'm having trouble connecting to my brain right now. Please try again later.";

pub struct ChatCompletionsAnswerGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatCompletionsAnswerGenerator {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AssistantError::Config("chat API key is empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
        })
    }

    /// Builds a generator from settings, or `None` when no key is set.
    pub fn from_settings(settings: &ChatSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.as_deref() else {
            return Ok(None);
        };
        Ok(Some(Self::new(api_key)?.with_base_url(&settings.base_url).with_model(&settings.model)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn complete(&self, messages: Vec<WireMessage<'_>>) -> std::result::Result<String, String> {
        let body = CompletionRequest { model: &self.model, messages, temperature: TEMPERATURE, max_tokens: MAX_TOKENS };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {text}"));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| format!("invalid response: {e}"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| "response had no content".to_string())
    }
}

/// The message list for a completion: system prompt (with any retrieved
/// context), the most recent history, and the query unless the history
/// already ends with it.
fn build_messages<'a>(query: &'a str, history: &'a [ChatMessage], chunks: &[String]) -> Vec<WireMessage<'a>> {
    let mut system = SYSTEM_PROMPT.to_string();
    if !chunks.is_empty() {
        system.push_str(&format!(
            "\n\nUse the following context to answer the user's question if relevant:\n{}\n\n\
             If the answer is not in the context, use your general knowledge but mention that you are not sure.",
            chunks.join("\n\n")
        ));
    }

    let mut messages = vec![WireMessage { role: "system", content: system.into() }];
    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    messages.extend(recent.iter().map(|message| WireMessage {
        role: message.role.as_str(),
        content: message.content.as_str().into(),
    }));
    if history.last().is_none_or(|last| last.content != query) {
        messages.push(WireMessage { role: "user", content: query.into() });
    }
    messages
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsAnswerGenerator {
    async fn generate_answer(&self, query: &str, history: &[ChatMessage], chunks: &[String]) -> String {
        let messages = build_messages(query, history, chunks);
        debug!(model = %self.model, messages = messages.len(), context_chunks = chunks.len(), "Requesting completion");
        match self.complete(messages).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(model = %self.model, error = %e, "Chat completion failed");
                API_FAILURE_REPLY.to_string()
            }
        }
    }
}
