use pulse_core::CoreError;
use thiserror::Error;

/// Errors raised while turning a webhook delivery into canonical comments.
///
/// All variants map to a 422 at the HTTP boundary except `UnknownPlatform`,
/// which the router resolves before verification runs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {platform} payload: {reason}")]
    Structure {
        platform: &'static str,
        reason: String,
    },
    #[error("comment message is empty after trimming")]
    EmptyMessage,
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

impl From<CoreError> for IngestError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyMessage => IngestError::EmptyMessage,
            CoreError::UnknownPlatform(p) => IngestError::UnknownPlatform(p),
        }
    }
}
