//! Per-platform webhook payload handling.
//!
//! Each platform module knows two things: how to unwrap that platform's
//! delivery envelope into individual comment events, and how to normalize one
//! event into a [`CanonicalComment`]. Dispatch is a match on [`PlatformType`];
//! adding a platform means one new module and two new match arms.

mod instagram;
mod linkedin;
mod twitter;
mod youtube;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use pulse_core::{CanonicalComment, PlatformType};

use crate::error::IngestError;

/// Unwrap a delivery envelope into the individual comment events it carries.
///
/// A delivery holding no comment events (an Instagram envelope with only
/// story mentions, a Twitter envelope of top-level tweets) yields an empty
/// list, which is not an error.
#[must_use]
pub fn extract_events(platform: PlatformType, payload: &Value) -> Vec<Value> {
    match platform {
        PlatformType::Instagram => instagram::extract_events(payload),
        PlatformType::Twitter => twitter::extract_events(payload),
        PlatformType::Youtube => youtube::extract_events(payload),
        PlatformType::Linkedin => linkedin::extract_events(payload),
    }
}

/// Normalize one comment event into the canonical model.
///
/// Missing optional fields default to `None`/empty rather than failing; a
/// message that is empty after trimming is a hard error, as is a missing
/// comment id.
///
/// # Errors
///
/// Returns [`IngestError::Structure`] when the event lacks its comment id and
/// [`IngestError::EmptyMessage`] when the message trims to nothing.
pub fn normalize(platform: PlatformType, event: &Value) -> Result<CanonicalComment, IngestError> {
    match platform {
        PlatformType::Instagram => instagram::normalize(event),
        PlatformType::Twitter => twitter::normalize(event),
        PlatformType::Youtube => youtube::normalize(event),
        PlatformType::Linkedin => linkedin::normalize(event),
    }
}

// ---- Shared field helpers ----

pub(super) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(std::string::ToString::to_string)
}

pub(super) fn required_str(
    value: &Value,
    key: &str,
    platform: PlatformType,
) -> Result<String, IngestError> {
    str_field(value, key).ok_or_else(|| IngestError::Structure {
        platform: platform.as_str(),
        reason: format!("missing {key}"),
    })
}

/// The full raw event, kept as opaque platform metadata on the canonical
/// comment.
pub(super) fn metadata_from(event: &Value) -> Map<String, Value> {
    event.as_object().cloned().unwrap_or_default()
}

/// Parse an ISO-8601 timestamp, tolerating a trailing `Z`.
pub(super) fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse Twitter's legacy `%a %b %d %H:%M:%S %z %Y` timestamp form.
pub(super) fn parse_twitter_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a millisecond epoch value.
pub(super) fn parse_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Fall back to the ingestion clock when the platform's own clock is missing
/// or unparseable. The comment is never dropped over a bad timestamp.
pub(super) fn now_fallback(platform: PlatformType, raw: Option<&str>) -> DateTime<Utc> {
    if let Some(raw) = raw {
        tracing::warn!(
            platform = %platform,
            raw = %raw,
            "unparseable event timestamp, falling back to ingestion time"
        );
    }
    Utc::now()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_iso_accepts_z_suffix() {
        let dt = parse_iso("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn parse_iso_accepts_offset() {
        assert!(parse_iso("2024-01-15T10:30:00+02:00").is_some());
    }

    #[test]
    fn parse_iso_rejects_garbage() {
        assert!(parse_iso("yesterday").is_none());
    }

    #[test]
    fn parse_twitter_time_legacy_format() {
        let dt = parse_twitter_time("Mon Jan 15 10:30:00 +0000 2024").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn parse_epoch_millis_round_trips() {
        let dt = parse_epoch_millis(1_705_314_600_000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn str_field_ignores_non_strings() {
        let v = json!({"a": 1, "b": "x"});
        assert_eq!(str_field(&v, "a"), None);
        assert_eq!(str_field(&v, "b").as_deref(), Some("x"));
    }

    #[test]
    fn normalize_is_deterministic() {
        let event = json!({
            "id": "ig_c1",
            "text": "Great post!",
            "from": {"id": "u1", "username": "alice"},
            "media": {"id": "m1", "permalink": "https://instagram.com/p/m1"},
            "timestamp": "2024-01-15T10:30:00Z"
        });
        let a = normalize(PlatformType::Instagram, &event).unwrap();
        let b = normalize(PlatformType::Instagram, &event).unwrap();
        assert_eq!(a, b);
    }
}
