//! Twitter webhook payloads (Account Activity style).
//!
//! Envelope: `tweet_create_events[]`, keeping only tweets that are replies
//! (`in_reply_to_status_id` present): a reply to a tracked account is what
//! counts as a comment. The author is nested under `user`, and
//! `in_reply_to_status_id_str` is both the post id and the parent pointer.

use serde_json::{json, Map, Value};

use pulse_core::{CanonicalAuthor, CanonicalComment, CanonicalPost, ContentType, PlatformType};

use crate::error::IngestError;
use crate::platforms::{metadata_from, now_fallback, parse_twitter_time, required_str, str_field};

pub(super) fn extract_events(payload: &Value) -> Vec<Value> {
    let Some(tweets) = payload.get("tweet_create_events").and_then(Value::as_array) else {
        return vec![];
    };

    tweets
        .iter()
        .filter(|tweet| {
            tweet
                .get("in_reply_to_status_id")
                .is_some_and(|v| !v.is_null())
        })
        .cloned()
        .collect()
}

pub(super) fn normalize(event: &Value) -> Result<CanonicalComment, IngestError> {
    let external_id = required_str(event, "id_str", PlatformType::Twitter)?;

    let user = event.get("user").cloned().unwrap_or(Value::Null);
    let author = CanonicalAuthor {
        external_id: str_field(&user, "id_str").unwrap_or_default(),
        username: str_field(&user, "screen_name"),
        display_name: str_field(&user, "name"),
        avatar_url: str_field(&user, "profile_image_url_https"),
        verified: user
            .get("verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        follower_count: user.get("followers_count").and_then(Value::as_i64),
    };

    let raw_created = str_field(event, "created_at");
    let created_at = raw_created
        .as_deref()
        .and_then(parse_twitter_time)
        .unwrap_or_else(|| now_fallback(PlatformType::Twitter, raw_created.as_deref()));

    // The payload does not carry the parent tweet's text or timestamp, only
    // its id.
    let post = CanonicalPost {
        external_id: str_field(event, "in_reply_to_status_id_str").unwrap_or_default(),
        content_type: ContentType::Text,
        text: None,
        media_urls: Vec::new(),
        url: None,
        created_at: None,
        engagement_metrics: Map::new(),
    };

    let mut engagement = Map::new();
    engagement.insert(
        "retweets".to_string(),
        json!(event.get("retweet_count").and_then(Value::as_i64).unwrap_or(0)),
    );
    engagement.insert(
        "likes".to_string(),
        json!(event
            .get("favorite_count")
            .and_then(Value::as_i64)
            .unwrap_or(0)),
    );

    CanonicalComment {
        external_id,
        platform: PlatformType::Twitter,
        author,
        post,
        message: str_field(event, "text").unwrap_or_default(),
        created_at,
        updated_at: None,
        parent_comment_id: str_field(event, "in_reply_to_status_id_str"),
        engagement_metrics: engagement,
        language: str_field(event, "lang"),
        is_spam: false,
        is_offensive: false,
        platform_metadata: metadata_from(event),
    }
    .validated()
    .map_err(IngestError::from)
}
