//! Model-facing plumbing for the PulsePilot pipeline: the embedding and
//! chat-completion HTTP clients, RAG prompt composition, model-output
//! coercion, and the per-model token pricing table.
//!
//! Nothing here touches the database. Callers retrieve context, hand it to
//! the composer, invoke a client, and persist whatever the coercion layer
//! hands back.

use thiserror::Error;

pub mod classify;
pub mod embedding;
pub mod llm;
pub mod pricing;
pub mod prompts;
pub mod suggestions;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("chat completion error: {0}")]
    Chat(String),

    #[error("model output error: {0}")]
    MalformedOutput(String),
}

pub use classify::{classify_comment, parse_classification, CLASSIFY_TEMPERATURE};
pub use embedding::{estimate_tokens, zero_vector, EmbeddingClient, EMBEDDING_DIM};
pub use llm::{ChatClient, ChatCompletion, ChatMessage};
pub use pricing::completion_cost;
pub use prompts::{
    compose_suggestion_prompt, max_reply_length, ReplyExample, SuggestionPrompt, MAX_EXAMPLES,
    SUGGESTION_TEMPERATURE,
};
pub use suggestions::{confidence_band, parse_suggestions, ParsedSuggestions, SuggestionCandidate};

/// Strips a markdown code fence from model output, if present.
///
/// Chat models frequently wrap JSON answers in ```` ```json ```` fences even
/// when told not to; both the suggestion and classification parsers accept
/// either form.
pub(crate) fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
