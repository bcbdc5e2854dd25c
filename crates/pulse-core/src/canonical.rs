//! Platform-agnostic canonical model for ingested social comments.
//!
//! Every platform's webhook payload is normalized into [`CanonicalComment`]
//! before anything downstream (storage, embedding, classification,
//! suggestion generation) sees it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Instagram,
    Twitter,
    Youtube,
    Linkedin,
}

impl PlatformType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformType::Instagram => "instagram",
            PlatformType::Twitter => "twitter",
            PlatformType::Youtube => "youtube",
            PlatformType::Linkedin => "linkedin",
        }
    }

    /// Platforms whose replies are capped at 280 characters.
    #[must_use]
    pub fn is_short_form(self) -> bool {
        matches!(self, PlatformType::Twitter | PlatformType::Instagram)
    }

    #[must_use]
    pub fn all() -> [PlatformType; 4] {
        [
            PlatformType::Instagram,
            PlatformType::Twitter,
            PlatformType::Youtube,
            PlatformType::Linkedin,
        ]
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(PlatformType::Instagram),
            "twitter" => Ok(PlatformType::Twitter),
            "youtube" => Ok(PlatformType::Youtube),
            "linkedin" => Ok(PlatformType::Linkedin),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
    Link,
    Story,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Link => "link",
            ContentType::Story => "story",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Lenient parse for model output; `None` on anything unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Anger,
    Sadness,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl Emotion {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joy" => Some(Emotion::Joy),
            "anger" => Some(Emotion::Anger),
            "sadness" => Some(Emotion::Sadness),
            "fear" => Some(Emotion::Fear),
            "surprise" => Some(Emotion::Surprise),
            "disgust" => Some(Emotion::Disgust),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Question,
    Complaint,
    Compliment,
    Suggestion,
    General,
}

impl Category {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "question" => Some(Category::Question),
            "complaint" => Some(Category::Complaint),
            "compliment" => Some(Category::Compliment),
            "suggestion" => Some(Category::Suggestion),
            "general" => Some(Category::General),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Question => "question",
            Category::Complaint => "complaint",
            Category::Compliment => "compliment",
            Category::Suggestion => "suggestion",
            Category::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Author snapshot taken at ingestion time. Not deduplicated across comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAuthor {
    pub external_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub follower_count: Option<i64>,
}

/// The post (media, tweet, video, share) the comment was left on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPost {
    pub external_id: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement_metrics: Map<String, Value>,
}

/// One normalized comment, ready for storage and fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalComment {
    pub external_id: String,
    pub platform: PlatformType,
    pub author: CanonicalAuthor,
    pub post: CanonicalPost,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    #[serde(default)]
    pub engagement_metrics: Map<String, Value>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_spam: bool,
    #[serde(default)]
    pub is_offensive: bool,
    #[serde(default)]
    pub platform_metadata: Map<String, Value>,
}

impl CanonicalComment {
    /// Trim the message and enforce that it is non-empty.
    ///
    /// An empty canonical comment is not meaningful, so whitespace-only
    /// payloads are rejected here rather than persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyMessage`] when the trimmed message is empty.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        let trimmed = self.message.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        if trimmed.len() != self.message.len() {
            self.message = trimmed.to_string();
        }
        Ok(self)
    }
}

/// Model-assigned sentiment/emotion/category with a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub emotion: Emotion,
    pub category: Category,
    pub confidence: f64,
}

impl Classification {
    /// Fallback used for empty comment text and for model failures.
    #[must_use]
    pub fn neutral() -> Self {
        Classification {
            sentiment: Sentiment::Neutral,
            emotion: Emotion::Neutral,
            category: Category::General,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> CanonicalAuthor {
        CanonicalAuthor {
            external_id: "user_1".to_string(),
            username: Some("alice".to_string()),
            display_name: None,
            avatar_url: None,
            verified: false,
            follower_count: None,
        }
    }

    fn post() -> CanonicalPost {
        CanonicalPost {
            external_id: "m1".to_string(),
            content_type: ContentType::Image,
            text: None,
            media_urls: Vec::new(),
            url: None,
            created_at: None,
            engagement_metrics: Map::new(),
        }
    }

    fn comment(message: &str) -> CanonicalComment {
        CanonicalComment {
            external_id: "c1".to_string(),
            platform: PlatformType::Instagram,
            author: author(),
            post: post(),
            message: message.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            parent_comment_id: None,
            engagement_metrics: Map::new(),
            language: None,
            is_spam: false,
            is_offensive: false,
            platform_metadata: Map::new(),
        }
    }

    #[test]
    fn platform_round_trips_through_serde() {
        for platform in PlatformType::all() {
            let json = serde_json::to_string(&platform).unwrap();
            let back: PlatformType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, platform);
            assert_eq!(json, format!("\"{platform}\""));
        }
    }

    #[test]
    fn platform_from_str_accepts_mixed_case() {
        assert_eq!(
            "Instagram".parse::<PlatformType>().unwrap(),
            PlatformType::Instagram
        );
        assert_eq!(
            " TWITTER ".parse::<PlatformType>().unwrap(),
            PlatformType::Twitter
        );
    }

    #[test]
    fn platform_from_str_rejects_unknown() {
        let err = "myspace".parse::<PlatformType>().unwrap_err();
        assert!(err.to_string().contains("myspace"));
    }

    #[test]
    fn short_form_platforms() {
        assert!(PlatformType::Twitter.is_short_form());
        assert!(PlatformType::Instagram.is_short_form());
        assert!(!PlatformType::Youtube.is_short_form());
        assert!(!PlatformType::Linkedin.is_short_form());
    }

    #[test]
    fn validated_trims_message() {
        let c = comment("  Great post!  ").validated().unwrap();
        assert_eq!(c.message, "Great post!");
    }

    #[test]
    fn validated_keeps_already_trimmed_message() {
        let c = comment("Great post!").validated().unwrap();
        assert_eq!(c.message, "Great post!");
    }

    #[test]
    fn validated_rejects_empty_message() {
        let err = comment("").validated().unwrap_err();
        assert!(matches!(err, CoreError::EmptyMessage));
    }

    #[test]
    fn validated_rejects_whitespace_only_message() {
        let err = comment("   \n\t  ").validated().unwrap_err();
        assert!(matches!(err, CoreError::EmptyMessage));
    }

    #[test]
    fn sentiment_parse_is_lenient() {
        assert_eq!(Sentiment::parse(" Positive "), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("NEGATIVE"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse("meh"), None);
    }

    #[test]
    fn emotion_parse_is_lenient() {
        assert_eq!(Emotion::parse("Joy"), Some(Emotion::Joy));
        assert_eq!(Emotion::parse("confused"), None);
    }

    #[test]
    fn category_parse_is_lenient() {
        assert_eq!(Category::parse("Question"), Some(Category::Question));
        assert_eq!(Category::parse("rant"), None);
    }

    #[test]
    fn neutral_classification_defaults() {
        let c = Classification::neutral();
        assert_eq!(c.sentiment, Sentiment::Neutral);
        assert_eq!(c.emotion, Emotion::Neutral);
        assert_eq!(c.category, Category::General);
        assert!((c.confidence - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn canonical_comment_serde_round_trip() {
        let c = comment("Love this flavor").validated().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: CanonicalComment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
