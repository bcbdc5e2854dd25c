use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::persona::TenantPersona;
use crate::ConfigError;

/// One row of the per-operation price table, seeded into the `pricing` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSeed {
    pub usage_type: String,
    pub price_per_token: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PricingFile {
    pub pricing: Vec<PricingSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSeed {
    pub name: String,
    #[serde(default)]
    pub persona: Option<TenantPersona>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub monthly_token_quota: Option<i64>,
}

impl TenantSeed {
    /// Generate a URL-safe slug from the tenant name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct TenantsFile {
    pub tenants: Vec<TenantSeed>,
}

/// Load and validate the pricing seed from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_pricing(path: &Path) -> Result<PricingFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let pricing_file: PricingFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SeedFileParse)?;

    validate_pricing(&pricing_file)?;

    Ok(pricing_file)
}

/// Load and validate the tenant seed from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tenants(path: &Path) -> Result<TenantsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let tenants_file: TenantsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SeedFileParse)?;

    validate_tenants(&tenants_file)?;

    Ok(tenants_file)
}

fn validate_pricing(pricing_file: &PricingFile) -> Result<(), ConfigError> {
    let mut seen_types = HashSet::new();

    for entry in &pricing_file.pricing {
        if entry.usage_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pricing usage_type must be non-empty".to_string(),
            ));
        }

        if entry.price_per_token.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "usage_type '{}' has negative price_per_token {}",
                entry.usage_type, entry.price_per_token
            )));
        }

        if !seen_types.insert(entry.usage_type.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate pricing usage_type: '{}'",
                entry.usage_type
            )));
        }
    }

    Ok(())
}

fn validate_tenants(tenants_file: &TenantsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for tenant in &tenants_file.tenants {
        if tenant.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tenant name must be non-empty".to_string(),
            ));
        }

        if let Some(quota) = tenant.monthly_token_quota {
            if quota < 0 {
                return Err(ConfigError::Validation(format!(
                    "tenant '{}' has negative monthly_token_quota {quota}",
                    tenant.name
                )));
            }
        }

        let lower_name = tenant.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate tenant name: '{}'",
                tenant.name
            )));
        }

        let slug = tenant.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate tenant slug: '{}' (from tenant '{}')",
                slug, tenant.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(name: &str) -> TenantSeed {
        TenantSeed {
            name: name.to_string(),
            persona: None,
            plan: None,
            monthly_token_quota: None,
        }
    }

    #[test]
    fn slug_simple_name() {
        assert_eq!(tenant("Acme Beverages").slug(), "acme-beverages");
    }

    #[test]
    fn slug_special_characters() {
        assert_eq!(tenant("Rosie's Kitchen").slug(), "rosies-kitchen");
    }

    #[test]
    fn slug_accented_characters() {
        // Non-ASCII chars are stripped; no dash inserted between adjacent ASCII chars
        assert_eq!(tenant("Café Olé").slug(), "caf-ol");
    }

    #[test]
    fn validate_rejects_empty_tenant_name() {
        let file = TenantsFile {
            tenants: vec![tenant("  ")],
        };
        let err = validate_tenants(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_negative_quota() {
        let mut t = tenant("Acme");
        t.monthly_token_quota = Some(-100);
        let file = TenantsFile { tenants: vec![t] };
        let err = validate_tenants(&file).unwrap_err();
        assert!(err.to_string().contains("negative monthly_token_quota"));
    }

    #[test]
    fn validate_rejects_duplicate_tenant_name() {
        let file = TenantsFile {
            tenants: vec![tenant("Acme"), tenant("acme")],
        };
        let err = validate_tenants(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate tenant name"));
    }

    #[test]
    fn validate_rejects_duplicate_tenant_slug() {
        let file = TenantsFile {
            tenants: vec![tenant("Acme Co"), tenant("Acme--Co")],
        };
        let err = validate_tenants(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate tenant"));
    }

    #[test]
    fn validate_accepts_valid_tenants() {
        let mut t = tenant("Acme");
        t.monthly_token_quota = Some(100_000);
        t.plan = Some("pro".to_string());
        let file = TenantsFile {
            tenants: vec![t, tenant("Borealis")],
        };
        assert!(validate_tenants(&file).is_ok());
    }

    #[test]
    fn validate_rejects_negative_price() {
        let file = PricingFile {
            pricing: vec![PricingSeed {
                usage_type: "embedding".to_string(),
                price_per_token: Decimal::new(-1, 4),
            }],
        };
        let err = validate_pricing(&file).unwrap_err();
        assert!(err.to_string().contains("negative price_per_token"));
    }

    #[test]
    fn validate_rejects_duplicate_usage_type() {
        let file = PricingFile {
            pricing: vec![
                PricingSeed {
                    usage_type: "embedding".to_string(),
                    price_per_token: Decimal::new(1, 4),
                },
                PricingSeed {
                    usage_type: "Embedding".to_string(),
                    price_per_token: Decimal::new(2, 4),
                },
            ],
        };
        let err = validate_pricing(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate pricing usage_type"));
    }

    #[test]
    fn validate_accepts_valid_pricing() {
        let file = PricingFile {
            pricing: vec![
                PricingSeed {
                    usage_type: "embedding".to_string(),
                    price_per_token: Decimal::new(1, 4),
                },
                PricingSeed {
                    usage_type: "generation".to_string(),
                    price_per_token: Decimal::new(2, 3),
                },
            ],
        };
        assert!(validate_pricing(&file).is_ok());
    }

    #[test]
    fn load_pricing_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("pricing.yaml");
        assert!(
            path.exists(),
            "pricing.yaml missing at {path:?}"
        );
        let result = load_pricing(&path);
        assert!(result.is_ok(), "failed to load pricing.yaml: {result:?}");
        let pricing_file = result.unwrap();
        assert!(!pricing_file.pricing.is_empty());
    }

    #[test]
    fn load_tenants_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("tenants.yaml");
        assert!(
            path.exists(),
            "tenants.yaml missing at {path:?}"
        );
        let result = load_tenants(&path);
        assert!(result.is_ok(), "failed to load tenants.yaml: {result:?}");
        let tenants_file = result.unwrap();
        assert!(!tenants_file.tenants.is_empty());
    }
}
