//! YouTube webhook payloads (PubSubHubbub push, pre-fetched comment shape).
//!
//! Envelope: a single comment resource under `comment`. Everything about the
//! comment itself is nested under `snippet`, including the author channel id
//! at `snippet.authorChannelId.value`.

use serde_json::{json, Map, Value};

use pulse_core::{CanonicalAuthor, CanonicalComment, CanonicalPost, ContentType, PlatformType};

use crate::error::IngestError;
use crate::platforms::{metadata_from, now_fallback, parse_iso, required_str, str_field};

pub(super) fn extract_events(payload: &Value) -> Vec<Value> {
    match payload.get("comment") {
        Some(comment) if comment.is_object() => vec![comment.clone()],
        _ => vec![],
    }
}

pub(super) fn normalize(event: &Value) -> Result<CanonicalComment, IngestError> {
    let external_id = required_str(event, "id", PlatformType::Youtube)?;

    let snippet = event.get("snippet").cloned().unwrap_or(Value::Null);

    let author = CanonicalAuthor {
        external_id: snippet
            .get("authorChannelId")
            .and_then(|c| c.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        username: str_field(&snippet, "authorDisplayName"),
        display_name: str_field(&snippet, "authorDisplayName"),
        avatar_url: str_field(&snippet, "authorProfileImageUrl"),
        verified: false,
        follower_count: None,
    };

    let video_id = str_field(&snippet, "videoId");
    let post = CanonicalPost {
        external_id: video_id.clone().unwrap_or_default(),
        content_type: ContentType::Video,
        text: None,
        media_urls: Vec::new(),
        url: video_id
            .as_deref()
            .map(|id| format!("https://youtube.com/watch?v={id}")),
        created_at: None,
        engagement_metrics: Map::new(),
    };

    let raw_published = str_field(&snippet, "publishedAt");
    let created_at = raw_published
        .as_deref()
        .and_then(parse_iso)
        .unwrap_or_else(|| now_fallback(PlatformType::Youtube, raw_published.as_deref()));

    let mut engagement = Map::new();
    engagement.insert(
        "likes".to_string(),
        json!(snippet
            .get("likeCount")
            .and_then(Value::as_i64)
            .unwrap_or(0)),
    );

    CanonicalComment {
        external_id,
        platform: PlatformType::Youtube,
        author,
        post,
        message: str_field(&snippet, "textDisplay").unwrap_or_default(),
        created_at,
        updated_at: str_field(&snippet, "updatedAt").as_deref().and_then(parse_iso),
        parent_comment_id: str_field(&snippet, "parentId"),
        engagement_metrics: engagement,
        language: None,
        is_spam: false,
        is_offensive: false,
        platform_metadata: metadata_from(event),
    }
    .validated()
    .map_err(IngestError::from)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn comment_resource() -> Value {
        json!({
            "id": "yt_c1",
            "snippet": {
                "videoId": "v123",
                "textDisplay": "Which song is this?",
                "authorDisplayName": "carol",
                "authorProfileImageUrl": "https://yt.example/carol.jpg",
                "authorChannelId": {"value": "UC_carol"},
                "publishedAt": "2024-01-15T10:30:00Z",
                "updatedAt": "2024-01-15T11:00:00Z",
                "parentId": "yt_c0",
                "likeCount": 7
            }
        })
    }

    #[test]
    fn extracts_single_comment() {
        let payload = json!({"comment": comment_resource()});
        let events = extract_events(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["id"], "yt_c1");
    }

    #[test]
    fn payload_without_comment_yields_nothing() {
        assert!(extract_events(&json!({"video": {"id": "v1"}})).is_empty());
        assert!(extract_events(&json!({"comment": "oops"})).is_empty());
    }

    #[test]
    fn normalizes_threaded_comment() {
        let c = normalize(&comment_resource()).unwrap();
        assert_eq!(c.platform, PlatformType::Youtube);
        assert_eq!(c.external_id, "yt_c1");
        assert_eq!(c.message, "Which song is this?");
        assert_eq!(c.author.external_id, "UC_carol");
        assert_eq!(c.author.display_name.as_deref(), Some("carol"));
        assert_eq!(c.post.external_id, "v123");
        assert_eq!(c.post.content_type, ContentType::Video);
        assert_eq!(
            c.post.url.as_deref(),
            Some("https://youtube.com/watch?v=v123")
        );
        assert_eq!(c.parent_comment_id.as_deref(), Some("yt_c0"));
        assert_eq!(c.engagement_metrics["likes"], json!(7));
        assert!(c.updated_at.is_some());
    }

    #[test]
    fn missing_video_id_means_no_post_url() {
        let c = normalize(&json!({
            "id": "yt_c2",
            "snippet": {"textDisplay": "hello"}
        }))
        .unwrap();
        assert_eq!(c.post.external_id, "");
        assert!(c.post.url.is_none());
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = normalize(&json!({
            "id": "yt_c3",
            "snippet": {"textDisplay": "\n\t"}
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::EmptyMessage));
    }
}
