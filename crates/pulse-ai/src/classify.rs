//! LLM-backed comment classification.
//!
//! Classification is best-effort: empty text and model failures both resolve
//! to the neutral fallback rather than failing the job, unlike suggestion
//! generation.

use pulse_core::{Category, Classification, Emotion, PlatformType, Sentiment};
use serde_json::Value;
use tracing::warn;

use crate::extract_json;
use crate::llm::{ChatClient, ChatMessage};

/// Low temperature for consistent classification.
pub const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Builds the single-message classification prompt.
#[must_use]
pub fn classification_messages(comment_text: &str, platform: PlatformType) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze the following social media comment and classify it across three dimensions:

1. Sentiment: positive, negative, or neutral
2. Emotion: joy, anger, sadness, fear, surprise, disgust, or neutral
3. Category: question, complaint, compliment, suggestion, or general

Comment: "{comment_text}"
Platform: {platform}

Provide your analysis as JSON with the following structure:
{{
    "sentiment": "positive|negative|neutral",
    "emotion": "joy|anger|sadness|fear|surprise|disgust|neutral",
    "category": "question|complaint|compliment|suggestion|general",
    "confidence": 0.95
}}

Consider the context and nuances of social media communication. Be precise and consistent in your classifications."#
    );

    vec![ChatMessage::user(prompt)]
}

/// Parses a model answer into a [`Classification`].
///
/// Returns `None` when the content is not JSON at all. Within valid JSON,
/// unknown or missing dimension values fall back to neutral/neutral/general
/// and a missing confidence defaults to 0.5 (clamped into [0, 1]).
#[must_use]
pub fn parse_classification(content: &str) -> Option<Classification> {
    let value: Value = serde_json::from_str(extract_json(content)).ok()?;

    let sentiment = value
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(Sentiment::parse)
        .unwrap_or(Sentiment::Neutral);
    let emotion = value
        .get("emotion")
        .and_then(Value::as_str)
        .and_then(Emotion::parse)
        .unwrap_or(Emotion::Neutral);
    let category = value
        .get("category")
        .and_then(Value::as_str)
        .and_then(Category::parse)
        .unwrap_or(Category::General);
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    Some(Classification {
        sentiment,
        emotion,
        category,
        confidence,
    })
}

/// Classifies one comment, returning the classification and the token count
/// actually consumed.
///
/// Empty text short-circuits to the neutral fallback with zero tokens and no
/// model call. A failed call also falls back with zero tokens; a successful
/// call whose answer cannot be parsed still consumed tokens, so those are
/// reported for metering.
pub async fn classify_comment(
    client: &ChatClient,
    comment_text: &str,
    platform: PlatformType,
) -> (Classification, i64) {
    let trimmed = comment_text.trim();
    if trimmed.is_empty() {
        return (Classification::neutral(), 0);
    }

    let messages = classification_messages(trimmed, platform);
    match client.complete(&messages, CLASSIFY_TEMPERATURE).await {
        Ok(completion) => {
            let tokens = completion.total_tokens();
            match parse_classification(&completion.content) {
                Some(classification) => (classification, tokens),
                None => {
                    warn!(
                        platform = %platform,
                        "classification answer was not JSON, using neutral fallback"
                    );
                    (Classification::neutral(), tokens)
                }
            }
        }
        Err(error) => {
            warn!(
                platform = %platform,
                error = %error,
                "classification call failed, using neutral fallback"
            );
            (Classification::neutral(), 0)
        }
    }
}
