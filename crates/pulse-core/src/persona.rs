use serde::{Deserialize, Serialize};

/// Tenant voice guidelines woven into suggestion prompts.
///
/// Stored as JSON on the tenant row; tenants without one get
/// [`TenantPersona::default`], a generic professional persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantPersona {
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_guidelines")]
    pub guidelines: String,
    #[serde(default = "default_avoid")]
    pub avoid: String,
}

fn default_voice() -> String {
    "Professional and friendly".to_string()
}

fn default_tone() -> String {
    "Helpful and engaging".to_string()
}

fn default_guidelines() -> String {
    "Be responsive, helpful, and maintain brand consistency".to_string()
}

fn default_avoid() -> String {
    "Avoid controversial topics, be overly promotional".to_string()
}

impl Default for TenantPersona {
    fn default() -> Self {
        TenantPersona {
            voice: default_voice(),
            tone: default_tone(),
            guidelines: default_guidelines(),
            avoid: default_avoid(),
        }
    }
}
