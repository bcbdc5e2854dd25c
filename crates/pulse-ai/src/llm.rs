//! Chat-completions HTTP client for classification and suggestion
//! generation.
//!
//! Speaks the OpenAI-compatible wire shape: `POST {base}/chat/completions`
//! with `{model, messages, temperature}`, reading the answer from
//! `choices[0].message.content` and token counts from `usage`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A completed model call: the answer text plus reported token counts.
///
/// Servers that omit `usage` yield zero counts; callers meter with their own
/// estimates in that case.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

impl ChatCompletion {
    #[must_use]
    pub fn total_tokens(&self) -> i64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Use [`ChatClient::new`] with the configured base URL (the production
/// default already ends in `/v1`); tests point it at a `wiremock` server.
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    /// Creates a client posting to `{base_url}/chat/completions`.
    ///
    /// `api_key`, when present, is sent as a bearer token; local
    /// OpenAI-compatible servers typically run without one.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.map(str::to_owned),
            model: model.to_owned(),
        })
    }

    /// The model name sent with every request, recorded on suggestions.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one completion request and returns the first choice.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] on network failure and [`AiError::Chat`] on
    /// a non-2xx status, an unparseable body, or a response with no choices.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatCompletion, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(AiError::Chat(format!(
                "model endpoint returned status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Chat(format!("completion response parse error: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Chat("completion response contained no choices".to_string()))?;
        let usage = body.usage.unwrap_or_default();

        Ok(ChatCompletion {
            content: choice.message.content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}}
            ],
            "usage": {"prompt_tokens": 120, "completion_tokens": 45, "total_tokens": 165}
        })
    }

    #[tokio::test]
    async fn complete_returns_first_choice_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hello")))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, "gpt-4-turbo-preview", 5).unwrap();
        let completion = client
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap();
        assert_eq!(completion.content, "hello");
        assert_eq!(completion.prompt_tokens, 120);
        assert_eq!(completion.completion_tokens, 45);
        assert_eq!(completion.total_tokens(), 165);
    }

    #[tokio::test]
    async fn complete_sends_bearer_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), Some("sk-test"), "gpt-4", 5).unwrap();
        let completion = client
            .complete(&[ChatMessage::user("hi")], 0.1)
            .await
            .unwrap();
        assert_eq!(completion.content, "ok");
    }

    #[tokio::test]
    async fn complete_defaults_missing_usage_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "no usage"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, "local-model", 5).unwrap();
        let completion = client
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap();
        assert_eq!(completion.total_tokens(), 0);
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": [], "usage": null})),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, "gpt-4", 5).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"), "{err}");
    }

    #[tokio::test]
    async fn complete_surfaces_http_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, "gpt-4", 5).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status 429"), "{err}");
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .mount(&server)
            .await;

        let base = format!("{}/v1/", server.uri());
        let client = ChatClient::new(&base, None, "gpt-4", 5).unwrap();
        let completion = client
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap();
        assert_eq!(completion.content, "ok");
    }
}
