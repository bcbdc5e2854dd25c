//! Coercion of model output into storable reply suggestions.
//!
//! The model is asked for strict JSON but routinely deviates: fenced output,
//! string-typed scores, missing fields, blank texts. This module accepts the
//! deviations the pipeline can repair and rejects the rest as
//! [`AiError::MalformedOutput`] so the job retries instead of persisting
//! garbage.

use serde_json::Value;

use crate::{extract_json, AiError};

/// One usable suggestion after coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionCandidate {
    pub text: String,
    /// Model self-assessment, clamped into [0, 1].
    pub score: f64,
}

/// The coerced result of one generation call.
#[derive(Debug, Clone)]
pub struct ParsedSuggestions {
    pub suggestions: Vec<SuggestionCandidate>,
    pub context_used: Option<String>,
    pub reasoning: Option<String>,
}

/// Default score when the model omits one or emits something unparseable.
const DEFAULT_SCORE: f64 = 0.5;

/// Parses and coerces a model answer.
///
/// Rules: blank or missing `text` drops the candidate; a missing or
/// unparseable `score` becomes 0.5; scores clamp into [0, 1]. *Some* usable
/// suggestions fewer than requested is fine; zero is a failure.
///
/// # Errors
///
/// Returns [`AiError::MalformedOutput`] when the content is not JSON, has no
/// `suggestions` array, or yields no usable candidate after coercion.
pub fn parse_suggestions(content: &str) -> Result<ParsedSuggestions, AiError> {
    let value: Value = serde_json::from_str(extract_json(content))
        .map_err(|e| AiError::MalformedOutput(format!("suggestion payload is not JSON: {e}")))?;

    let items = value
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AiError::MalformedOutput("suggestion payload has no suggestions array".to_string())
        })?;

    let mut suggestions = Vec::with_capacity(items.len());
    for item in items {
        let text = item
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        if text.is_empty() {
            continue;
        }
        suggestions.push(SuggestionCandidate {
            text: text.to_string(),
            score: coerce_score(item.get("score")),
        });
    }

    if suggestions.is_empty() {
        return Err(AiError::MalformedOutput(
            "suggestion payload yielded no usable suggestions".to_string(),
        ));
    }

    Ok(ParsedSuggestions {
        suggestions,
        context_used: owned_str(value.get("context_used")),
        reasoning: owned_str(value.get("reasoning")),
    })
}

fn coerce_score(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        // Models sometimes quote the number.
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.unwrap_or(DEFAULT_SCORE).clamp(0.0, 1.0)
}

fn owned_str(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

/// Confidence band reported alongside a suggestion's score.
#[must_use]
pub fn confidence_band(score: f64) -> &'static str {
    if score > 0.8 {
        "high"
    } else if score > 0.6 {
        "medium"
    } else {
        "low"
    }
}
