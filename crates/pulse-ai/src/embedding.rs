//! TEI-style HTTP client for embedding generation.

use std::time::Duration;

use serde::Serialize;

use crate::AiError;

/// Dimension of every vector this pipeline stores and compares.
pub const EMBEDDING_DIM: usize = 384;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

/// Client for a Text Embeddings Inference style service.
///
/// Use [`EmbeddingClient::new`] with the configured base URL; tests point it
/// at a `wiremock` server instead.
pub struct EmbeddingClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
}

impl EmbeddingClient {
    /// Creates a client posting to `{base_url}/embed`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/embed", base_url.trim_end_matches('/')),
        })
    }

    /// Generates embeddings for a batch of texts.
    ///
    /// Texts are batched into groups of [`BATCH_SIZE`] per request. Returns
    /// one [`EMBEDDING_DIM`]-dimensional vector per input text, in the same
    /// order. Blank inputs are sent to the service as-is; use
    /// [`EmbeddingClient::embed_text`] for the single-text path that
    /// short-circuits them.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Embedding`] if the request fails, the response
    /// cannot be parsed, or the service returns the wrong number or
    /// dimension of vectors.
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AiError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest { inputs: chunk };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| AiError::Embedding(format!("embed request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(AiError::Embedding(format!(
                    "embedding service returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| AiError::Embedding(format!("embed response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(AiError::Embedding(format!(
                    "embedding service returned {} vectors for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            for embedding in &embeddings {
                if embedding.len() != EMBEDDING_DIM {
                    return Err(AiError::Embedding(format!(
                        "embedding service returned a {}-dimensional vector, expected {}",
                        embedding.len(),
                        EMBEDDING_DIM
                    )));
                }
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    /// Embeds a single text.
    ///
    /// Empty or whitespace-only text yields the zero vector without calling
    /// the service, so blank comments embed deterministically and cost
    /// nothing.
    ///
    /// # Errors
    ///
    /// Same as [`EmbeddingClient::embed`].
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(zero_vector());
        }

        let mut embeddings = self.embed(&[trimmed]).await?;
        // embed() guarantees one vector per input.
        embeddings
            .pop()
            .ok_or_else(|| AiError::Embedding("embedding service returned no vectors".to_string()))
    }
}

/// The [`EMBEDDING_DIM`]-dimensional zero vector used for blank text.
#[must_use]
pub fn zero_vector() -> Vec<f32> {
    vec![0.0; EMBEDDING_DIM]
}

/// Estimates the token count of an embedding input when the service reports
/// none: one token per four characters, floored at one.
#[must_use]
pub fn estimate_tokens(text: &str) -> i64 {
    let quarters = text.chars().count() / 4;
    i64::try_from(quarters.max(1)).unwrap_or(i64::MAX)
}
