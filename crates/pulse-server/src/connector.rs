//! Posting approved replies back to their source platform.
//!
//! Only Instagram has a connector today; the other platforms reject reply
//! submission as unsupported rather than silently dropping it, so the job
//! fails with a clear error instead of looking done.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use pulse_core::{AppConfig, PlatformType};

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("no reply connector for {0}")]
    Unsupported(PlatformType),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("platform API answered {status}: {body}")]
    Api { status: u16, body: String },
}

impl ConnectorError {
    /// Whether a retry could plausibly succeed. Timeouts, connection
    /// failures, and 5xx answers are transient; everything else is not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ConnectorError::Http(e) => e.is_timeout() || e.is_connect(),
            ConnectorError::Api { status, .. } => *status >= 500,
            ConnectorError::Unsupported(_) => false,
        }
    }
}

/// The platform's acknowledgement of a posted reply.
#[derive(Debug)]
pub struct PostedReply {
    pub external_reply_id: Option<String>,
}

/// Client for the Instagram Graph API reply endpoint.
pub struct InstagramConnector {
    client: Client,
    graph_url: String,
}

impl InstagramConnector {
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(graph_url: &str) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pulsepilot/0.1 (comment-engagement)")
            .build()?;

        Ok(Self {
            client,
            graph_url: graph_url.trim_end_matches('/').to_string(),
        })
    }

    /// Post a reply under an Instagram comment.
    ///
    /// The Graph API takes the message and token as form fields on
    /// `POST /{comment_id}/replies` and answers with the new comment's id.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Http`] on network failure.
    /// - [`ConnectorError::Api`] when the Graph API answers non-2xx.
    async fn post_reply(
        &self,
        external_comment_id: &str,
        message: &str,
        access_token: &str,
    ) -> Result<PostedReply, ConnectorError> {
        let url = format!("{}/{}/replies", self.graph_url, external_comment_id);
        let response = self
            .client
            .post(&url)
            .form(&[("message", message), ("access_token", access_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(PostedReply {
            external_reply_id: body
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
        })
    }
}

/// Per-platform connector dispatch.
pub struct Connectors {
    instagram: InstagramConnector,
}

impl Connectors {
    /// # Errors
    ///
    /// Returns [`ConnectorError::Http`] if a client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConnectorError> {
        Ok(Self {
            instagram: InstagramConnector::new(&config.instagram_graph_url)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`ConnectorError::Unsupported`] for platforms without a
    /// connector, otherwise whatever the platform client returns.
    pub async fn post_reply(
        &self,
        platform: PlatformType,
        external_comment_id: &str,
        message: &str,
        access_token: &str,
    ) -> Result<PostedReply, ConnectorError> {
        match platform {
            PlatformType::Instagram => {
                self.instagram
                    .post_reply(external_comment_id, message, access_token)
                    .await
            }
            other => Err(ConnectorError::Unsupported(other)),
        }
    }
}
