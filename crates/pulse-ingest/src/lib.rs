//! Webhook ingestion primitives.
//!
//! Everything that happens between raw webhook bytes and a validated
//! [`pulse_core::CanonicalComment`]: signature verification over the exact
//! bytes received, content hashing for delivery dedup, and per-platform
//! envelope extraction + normalization.

pub mod dedup;
pub mod error;
pub mod platforms;
pub mod signature;

pub use dedup::{canonical_json, payload_hash};
pub use error::IngestError;
pub use platforms::{extract_events, normalize};
pub use signature::{signature_header, verify_signature, WebhookSecrets};
