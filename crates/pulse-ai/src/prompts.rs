//! RAG prompt composition for reply suggestions.
//!
//! Builds the system/user message pair from the comment, the tenant persona,
//! and retrieved examples of past successful replies. Pure string work, unit
//! tested without any model in the loop.

use pulse_core::{PlatformType, TenantPersona};

use crate::llm::ChatMessage;

/// Retrieved examples beyond this count are dropped from the prompt.
pub const MAX_EXAMPLES: usize = 5;

/// Sampling temperature for suggestion generation.
pub const SUGGESTION_TEMPERATURE: f32 = 0.7;

/// Reply length cap quoted to the model for short-form platforms.
pub const SHORT_FORM_MAX_LENGTH: usize = 280;

/// Reply length cap quoted to the model for long-form platforms.
pub const LONG_FORM_MAX_LENGTH: usize = 2200;

/// One retrieved (comment, successful reply) pair with its similarity score.
#[derive(Debug, Clone)]
pub struct ReplyExample {
    pub comment_message: String,
    pub platform: String,
    pub reply_message: String,
    pub replier_name: Option<String>,
    /// Cosine similarity in [0, 1]; higher is closer.
    pub similarity: f64,
}

/// Composed system/user message pair for one suggestion request.
#[derive(Debug, Clone)]
pub struct SuggestionPrompt {
    pub system: String,
    pub user: String,
}

impl SuggestionPrompt {
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }
}

/// Maximum reply length quoted in the platform-constraints prompt block.
#[must_use]
pub fn max_reply_length(platform: PlatformType) -> usize {
    if platform.is_short_form() {
        SHORT_FORM_MAX_LENGTH
    } else {
        LONG_FORM_MAX_LENGTH
    }
}

/// Renders the persona block woven into the system prompt.
#[must_use]
pub fn persona_guidelines(persona: &TenantPersona) -> String {
    format!(
        "Brand Voice: {}\nTone: {}\nGuidelines: {}\nDo Not: {}",
        persona.voice, persona.tone, persona.guidelines, persona.avoid
    )
}

/// Renders the retrieved examples block, capped at [`MAX_EXAMPLES`].
#[must_use]
pub fn context_examples(examples: &[ReplyExample]) -> String {
    if examples.is_empty() {
        return "No similar examples found.".to_string();
    }

    let blocks: Vec<String> = examples
        .iter()
        .take(MAX_EXAMPLES)
        .enumerate()
        .map(|(i, example)| {
            format!(
                "Example {n} (Similarity: {similarity:.2}):\n\
                 Original Comment: \"{comment}\"\n\
                 Platform: {platform}\n\
                 Successful Reply: \"{reply}\"\n\
                 Replier: {replier}",
                n = i + 1,
                similarity = example.similarity,
                comment = example.comment_message,
                platform = example.platform,
                reply = example.reply_message,
                replier = example.replier_name.as_deref().unwrap_or("unknown"),
            )
        })
        .collect();

    blocks.join("\n\n")
}

/// Composes the full prompt for one comment.
///
/// `author` is the display name shown to the model; callers resolve it from
/// the comment's author snapshot.
#[must_use]
pub fn compose_suggestion_prompt(
    comment_message: &str,
    platform: PlatformType,
    author: &str,
    persona: &TenantPersona,
    examples: &[ReplyExample],
    num_suggestions: usize,
) -> SuggestionPrompt {
    let persona_block = persona_guidelines(persona);
    let examples_block = context_examples(examples);
    let max_length = max_reply_length(platform);

    let system = format!(
        r#"You are an AI assistant helping social media managers craft appropriate replies to comments using context from similar successful interactions.

Your task is to generate {num_suggestions} different reply suggestions for the given comment, considering:
1. The tone and context of the original comment
2. The brand's persona and voice guidelines
3. Similar successful replies from the past
4. Platform-specific best practices

Brand Persona & Guidelines:
{persona_block}

Similar Successful Interactions (for context):
{examples_block}

Platform Constraints:
- Platform: {platform}
- Maximum length: {max_length} characters
- Tone should match the original comment appropriately

Guidelines:
- Keep replies concise and engaging
- Be helpful and add value
- Avoid controversial topics
- Include a call-to-action when appropriate
- Learn from the successful reply patterns shown above

Return your response as JSON with this structure:
{{
    "suggestions": [
        {{"text": "reply text", "score": 0.9, "tone": "friendly", "reasoning": "why this works"}},
        {{"text": "reply text", "score": 0.8, "tone": "professional", "reasoning": "why this works"}},
        {{"text": "reply text", "score": 0.7, "tone": "casual", "reasoning": "why this works"}}
    ],
    "context_used": "how similar examples influenced suggestions",
    "reasoning": "overall approach explanation"
}}"#
    );

    let user = format!(
        "Original Comment: \"{comment_message}\"\n\
         Platform: {platform}\n\
         Author: {author}\n\n\
         Generate {num_suggestions} contextually-aware reply suggestions:"
    );

    SuggestionPrompt { system, user }
}
