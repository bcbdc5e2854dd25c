//! Instagram Graph webhook payloads.
//!
//! Envelope: `entry[].changes[]` where `field == "comments"`; the comment
//! event sits under `value`. The author is nested under `from` (username
//! doubles as display name) and the post under `media`.

use serde_json::{Map, Value};

use pulse_core::{CanonicalAuthor, CanonicalComment, CanonicalPost, ContentType, PlatformType};

use crate::error::IngestError;
use crate::platforms::{metadata_from, now_fallback, parse_iso, required_str, str_field};

pub(super) fn extract_events(payload: &Value) -> Vec<Value> {
    let Some(entries) = payload.get("entry").and_then(Value::as_array) else {
        return vec![];
    };

    entries
        .iter()
        .filter_map(|entry| entry.get("changes").and_then(Value::as_array))
        .flatten()
        .filter(|change| change.get("field").and_then(Value::as_str) == Some("comments"))
        .filter_map(|change| change.get("value").cloned())
        .collect()
}

pub(super) fn normalize(event: &Value) -> Result<CanonicalComment, IngestError> {
    let external_id = required_str(event, "id", PlatformType::Instagram)?;

    let from = event.get("from").cloned().unwrap_or(Value::Null);
    let author = CanonicalAuthor {
        external_id: str_field(&from, "id").unwrap_or_default(),
        username: str_field(&from, "username"),
        display_name: str_field(&from, "username"),
        avatar_url: None,
        verified: false,
        follower_count: None,
    };

    let media = event.get("media").cloned().unwrap_or(Value::Null);
    let post = CanonicalPost {
        external_id: str_field(&media, "id").unwrap_or_default(),
        content_type: ContentType::Image,
        text: None,
        media_urls: Vec::new(),
        url: str_field(&media, "permalink"),
        created_at: None,
        engagement_metrics: Map::new(),
    };

    let raw_timestamp = str_field(event, "timestamp");
    let created_at = raw_timestamp
        .as_deref()
        .and_then(parse_iso)
        .unwrap_or_else(|| now_fallback(PlatformType::Instagram, raw_timestamp.as_deref()));

    CanonicalComment {
        external_id,
        platform: PlatformType::Instagram,
        author,
        post,
        message: str_field(event, "text").unwrap_or_default(),
        created_at,
        updated_at: None,
        parent_comment_id: str_field(event, "parent_id"),
        engagement_metrics: Map::new(),
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

    fn comment_event() -> Value {
        json!({
            "id": "ig_comment_1",
            "text": "Great post!",
            "from": {"id": "ig_user_1", "username": "alice"},
            "media": {"id": "m1", "permalink": "https://instagram.com/p/abc"},
            "timestamp": "2024-01-15T10:30:00Z"
        })
    }

    #[test]
    fn extracts_comment_changes_only() {
        let payload = json!({
            "entry": [{
                "id": "page_1",
                "changes": [
                    {"field": "comments", "value": comment_event()},
                    {"field": "story_insights", "value": {"id": "x"}}
                ]
            }]
        });
        let events = extract_events(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["id"], "ig_comment_1");
    }

    #[test]
    fn empty_envelope_yields_no_events() {
        assert!(extract_events(&json!({})).is_empty());
        assert!(extract_events(&json!({"entry": []})).is_empty());
    }

    #[test]
    fn normalizes_complete_event() {
        let c = normalize(&comment_event()).unwrap();
        assert_eq!(c.platform, PlatformType::Instagram);
        assert_eq!(c.external_id, "ig_comment_1");
        assert_eq!(c.message, "Great post!");
        assert_eq!(c.author.external_id, "ig_user_1");
        assert_eq!(c.author.username.as_deref(), Some("alice"));
        assert_eq!(c.author.display_name.as_deref(), Some("alice"));
        assert_eq!(c.post.external_id, "m1");
        assert_eq!(c.post.content_type, ContentType::Image);
        assert_eq!(
            c.post.url.as_deref(),
            Some("https://instagram.com/p/abc")
        );
        assert_eq!(c.created_at.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert!(c.platform_metadata.contains_key("from"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let c = normalize(&json!({"id": "c2", "text": "hello"})).unwrap();
        assert_eq!(c.author.external_id, "");
        assert!(c.author.username.is_none());
        assert_eq!(c.post.external_id, "");
        assert!(c.post.url.is_none());
    }

    #[test]
    fn missing_id_is_structural_error() {
        let err = normalize(&json!({"text": "hello"})).unwrap_err();
        assert!(matches!(err, IngestError::Structure { .. }));
    }

    #[test]
    fn whitespace_message_is_rejected() {
        let err = normalize(&json!({"id": "c3", "text": "   "})).unwrap_err();
        assert!(matches!(err, IngestError::EmptyMessage));
    }

    #[test]
    fn message_is_trimmed() {
        let c = normalize(&json!({"id": "c4", "text": "  nice  "})).unwrap();
        assert_eq!(c.message, "nice");
    }

    #[test]
    fn bad_timestamp_falls_back_to_now() {
        let before = chrono::Utc::now();
        let c = normalize(&json!({"id": "c5", "text": "hi", "timestamp": "not-a-time"})).unwrap();
        assert!(c.created_at >= before);
    }
}
