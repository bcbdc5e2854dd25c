//! LinkedIn webhook payloads.
//!
//! Envelope: `events[]` where `eventType == "COMMENT_CREATED"`. The comment
//! itself is nested under `comment`, with the author as a URN string, the
//! post id under `object`, the text under `message.text`, and a millisecond
//! epoch under `created.time`.

use serde_json::{Map, Value};

use pulse_core::{CanonicalAuthor, CanonicalComment, CanonicalPost, ContentType, PlatformType};

use crate::error::IngestError;
use crate::platforms::{
    metadata_from, now_fallback, parse_epoch_millis, parse_iso, str_field,
};

pub(super) fn extract_events(payload: &Value) -> Vec<Value> {
    let Some(events) = payload.get("events").and_then(Value::as_array) else {
        return vec![];
    };

    events
        .iter()
        .filter(|event| {
            event.get("eventType").and_then(Value::as_str) == Some("COMMENT_CREATED")
        })
        .cloned()
        .collect()
}

pub(super) fn normalize(event: &Value) -> Result<CanonicalComment, IngestError> {
    let comment = event.get("comment").cloned().unwrap_or(Value::Null);

    let external_id = str_field(&comment, "id").ok_or_else(|| IngestError::Structure {
        platform: PlatformType::Linkedin.as_str(),
        reason: "missing comment.id".to_string(),
    })?;

    let author_urn = str_field(&comment, "author");
    let author = CanonicalAuthor {
        external_id: author_urn.clone().unwrap_or_default(),
        username: author_urn,
        display_name: str_field(&comment, "authorName"),
        avatar_url: None,
        verified: false,
        follower_count: None,
    };

    let post = CanonicalPost {
        external_id: str_field(&comment, "object").unwrap_or_default(),
        content_type: ContentType::Text,
        text: None,
        media_urls: Vec::new(),
        url: None,
        created_at: None,
        engagement_metrics: Map::new(),
    };

    let created_at = parse_created(&comment)
        .unwrap_or_else(|| now_fallback(PlatformType::Linkedin, None));

    CanonicalComment {
        external_id,
        platform: PlatformType::Linkedin,
        author,
        post,
        message: comment
            .get("message")
            .and_then(|m| m.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        created_at,
        updated_at: None,
        parent_comment_id: str_field(&comment, "parentComment"),
        engagement_metrics: Map::new(),
        language: None,
        is_spam: false,
        is_offensive: false,
        platform_metadata: metadata_from(event),
    }
    .validated()
    .map_err(IngestError::from)
}

/// `created.time` is a millisecond epoch in the wild; some fixtures carry an
/// ISO string instead, so both are accepted.
fn parse_created(comment: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    let time = comment.get("created").and_then(|c| c.get("time"))?;
    match time {
        Value::Number(n) => n.as_i64().and_then(parse_epoch_millis),
        Value::String(s) => parse_iso(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn comment_event() -> Value {
        json!({
            "eventType": "COMMENT_CREATED",
            "comment": {
                "id": "li_c1",
                "author": "urn:li:person:abc",
                "authorName": "Dana",
                "object": "urn:li:share:999",
                "message": {"text": "Interested in a partnership"},
                "created": {"time": 1_705_314_600_000_i64}
            }
        })
    }

    #[test]
    fn extracts_comment_created_events_only() {
        let payload = json!({
            "events": [
                comment_event(),
                {"eventType": "SHARE_LIFECYCLE", "share": {"id": "s1"}}
            ]
        });
        let events = extract_events(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["comment"]["id"], "li_c1");
    }

    #[test]
    fn normalizes_business_comment() {
        let c = normalize(&comment_event()).unwrap();
        assert_eq!(c.platform, PlatformType::Linkedin);
        assert_eq!(c.external_id, "li_c1");
        assert_eq!(c.message, "Interested in a partnership");
        assert_eq!(c.author.external_id, "urn:li:person:abc");
        assert_eq!(c.author.username.as_deref(), Some("urn:li:person:abc"));
        assert_eq!(c.author.display_name.as_deref(), Some("Dana"));
        assert_eq!(c.post.external_id, "urn:li:share:999");
        assert_eq!(c.created_at.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn iso_created_time_is_accepted() {
        let mut event = comment_event();
        event["comment"]["created"]["time"] = json!("2024-01-15T10:30:00Z");
        let c = normalize(&event).unwrap();
        assert_eq!(c.created_at.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn missing_created_time_falls_back_to_now() {
        let before = chrono::Utc::now();
        let mut event = comment_event();
        event["comment"]
            .as_object_mut()
            .unwrap()
            .remove("created");
        let c = normalize(&event).unwrap();
        assert!(c.created_at >= before);
    }

    #[test]
    fn missing_comment_id_is_structural_error() {
        let err = normalize(&json!({
            "eventType": "COMMENT_CREATED",
            "comment": {"message": {"text": "hi"}}
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::Structure { .. }));
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut event = comment_event();
        event["comment"]["message"]["text"] = json!("  ");
        let err = normalize(&event).unwrap_err();
        assert!(matches!(err, IngestError::EmptyMessage));
    }
}
