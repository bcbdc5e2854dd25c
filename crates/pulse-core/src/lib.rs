//! Shared domain types and configuration for the PulsePilot comment pipeline.
//!
//! Holds the canonical comment model produced by webhook normalization, the
//! tenant persona type consumed by suggestion prompts, environment-driven
//! application configuration, and the YAML seed-file types for pricing and
//! tenants.

use thiserror::Error;

pub mod app_config;
pub mod canonical;
pub mod config;
pub mod persona;
pub mod seeds;

/// Errors from canonical-model validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("comment message is empty after trimming")]
    EmptyMessage,
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

/// Errors from configuration loading and seed-file parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file: {0}")]
    SeedFileParse(serde_yaml::Error),
    #[error("seed validation failed: {0}")]
    Validation(String),
}

pub use app_config::{AppConfig, EditPolicy, Environment};
pub use canonical::{
    CanonicalAuthor, CanonicalComment, CanonicalPost, Category, Classification, ContentType,
    Emotion, PlatformType, Sentiment,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use persona::TenantPersona;
pub use seeds::{load_pricing, load_tenants, PricingFile, PricingSeed, TenantSeed, TenantsFile};
