//! Per-platform webhook signature verification.
//!
//! Signatures are HMAC-SHA256 over the exact raw bytes received, so callers
//! must verify before any JSON parsing; parsing and re-serializing would
//! change the bytes and break verification. A missing configured secret or a
//! missing signature header fails verification rather than erroring; the
//! endpoint rejects with 401 either way.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use pulse_core::{AppConfig, PlatformType};

use crate::dedup::to_hex;

type HmacSha256 = Hmac<Sha256>;

/// Shared secrets for the platforms that sign their deliveries.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub instagram_app_secret: Option<String>,
    pub twitter_consumer_secret: Option<String>,
    pub linkedin_client_secret: Option<String>,
}

impl WebhookSecrets {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        WebhookSecrets {
            instagram_app_secret: config.instagram_app_secret.clone(),
            twitter_consumer_secret: config.twitter_consumer_secret.clone(),
            linkedin_client_secret: config.linkedin_client_secret.clone(),
        }
    }
}

/// The header each platform carries its signature in, if it signs at all.
#[must_use]
pub fn signature_header(platform: PlatformType) -> Option<&'static str> {
    match platform {
        PlatformType::Instagram => Some("x-hub-signature-256"),
        PlatformType::Twitter => Some("x-twitter-webhooks-signature"),
        PlatformType::Youtube => None,
        PlatformType::Linkedin => Some("x-linkedin-signature"),
    }
}

/// Verify a delivery's signature against the platform's shared secret.
///
/// `header` looks up request headers by lowercase name. YouTube publishes
/// over PubSubHubbub with no HMAC header and always passes.
pub fn verify_signature<F>(
    platform: PlatformType,
    body: &[u8],
    header: F,
    secrets: &WebhookSecrets,
) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match platform {
        PlatformType::Instagram => check_hmac(
            secrets.instagram_app_secret.as_deref(),
            header("x-hub-signature-256"),
            Some("sha256="),
            body,
        ),
        PlatformType::Twitter => check_hmac(
            secrets.twitter_consumer_secret.as_deref(),
            header("x-twitter-webhooks-signature"),
            Some("sha256="),
            body,
        ),
        PlatformType::Youtube => true,
        PlatformType::Linkedin => check_hmac(
            secrets.linkedin_client_secret.as_deref(),
            header("x-linkedin-signature"),
            None,
            body,
        ),
    }
}

fn check_hmac(
    secret: Option<&str>,
    provided: Option<String>,
    prefix: Option<&str>,
    body: &[u8],
) -> bool {
    let Some(secret) = secret else {
        return false;
    };
    let Some(provided) = provided else {
        return false;
    };

    let provided = match prefix {
        Some(p) => match provided.strip_prefix(p) {
            Some(stripped) => stripped.to_string(),
            None => return false,
        },
        None => provided,
    };

    // HMAC accepts any key length; the Err arm cannot fire.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = to_hex(&mac.finalize().into_bytes());

    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        to_hex(&mac.finalize().into_bytes())
    }

    fn header_from_map<'a>(map: &'a HashMap<&'a str, String>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| map.get(name).cloned()
    }

    fn secrets() -> WebhookSecrets {
        WebhookSecrets {
            instagram_app_secret: Some("ig-secret".to_string()),
            twitter_consumer_secret: Some("tw-secret".to_string()),
            linkedin_client_secret: Some("li-secret".to_string()),
        }
    }

    #[test]
    fn instagram_valid_signature_passes() {
        let body = br#"{"entry":[]}"#;
        let mut headers = HashMap::new();
        headers.insert(
            "x-hub-signature-256",
            format!("sha256={}", sign("ig-secret", body)),
        );
        assert!(verify_signature(
            PlatformType::Instagram,
            body,
            header_from_map(&headers),
            &secrets(),
        ));
    }

    #[test]
    fn instagram_rejects_missing_prefix() {
        let body = br#"{"entry":[]}"#;
        let mut headers = HashMap::new();
        headers.insert("x-hub-signature-256", sign("ig-secret", body));
        assert!(!verify_signature(
            PlatformType::Instagram,
            body,
            header_from_map(&headers),
            &secrets(),
        ));
    }

    #[test]
    fn flipped_body_byte_invalidates_signature() {
        let body = b"{\"text\":\"Great post!\"}".to_vec();
        let mut headers = HashMap::new();
        headers.insert(
            "x-hub-signature-256",
            format!("sha256={}", sign("ig-secret", &body)),
        );

        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(
                !verify_signature(
                    PlatformType::Instagram,
                    &tampered,
                    header_from_map(&headers),
                    &secrets(),
                ),
                "flipping byte {i} should invalidate the signature"
            );
        }
    }

    #[test]
    fn missing_header_fails_closed() {
        let headers = HashMap::new();
        assert!(!verify_signature(
            PlatformType::Twitter,
            b"{}",
            header_from_map(&headers),
            &secrets(),
        ));
    }

    #[test]
    fn missing_secret_fails_closed() {
        let body = b"{}";
        let mut headers = HashMap::new();
        headers.insert(
            "x-twitter-webhooks-signature",
            format!("sha256={}", sign("tw-secret", body)),
        );
        let no_secrets = WebhookSecrets::default();
        assert!(!verify_signature(
            PlatformType::Twitter,
            body,
            header_from_map(&headers),
            &no_secrets,
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"{}";
        let mut headers = HashMap::new();
        headers.insert(
            "x-twitter-webhooks-signature",
            format!("sha256={}", sign("other-secret", body)),
        );
        assert!(!verify_signature(
            PlatformType::Twitter,
            body,
            header_from_map(&headers),
            &secrets(),
        ));
    }

    #[test]
    fn youtube_always_passes() {
        let headers = HashMap::new();
        assert!(verify_signature(
            PlatformType::Youtube,
            b"anything",
            header_from_map(&headers),
            &WebhookSecrets::default(),
        ));
    }

    #[test]
    fn linkedin_uses_bare_hex_signature() {
        let body = br#"{"events":[]}"#;
        let mut headers = HashMap::new();
        headers.insert("x-linkedin-signature", sign("li-secret", body));
        assert!(verify_signature(
            PlatformType::Linkedin,
            body,
            header_from_map(&headers),
            &secrets(),
        ));

        let mut prefixed = HashMap::new();
        prefixed.insert(
            "x-linkedin-signature",
            format!("sha256={}", sign("li-secret", body)),
        );
        assert!(!verify_signature(
            PlatformType::Linkedin,
            body,
            header_from_map(&prefixed),
            &secrets(),
        ));
    }

    #[test]
    fn signature_header_names() {
        assert_eq!(
            signature_header(PlatformType::Instagram),
            Some("x-hub-signature-256")
        );
        assert_eq!(signature_header(PlatformType::Youtube), None);
    }
}
