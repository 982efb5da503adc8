//! # Association Configuration
//!
//! Protocol domain and payload limits for the association service.

use super::canonical::{Canonicalizer, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION};
use serde::{Deserialize, Serialize};
use std::env;

/// Default cap on `data` payload size (64 KiB).
pub const DEFAULT_MAX_DATA_LEN: usize = 64 * 1024;

/// Configuration for the association service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Protocol name bound into the domain separator.
    pub domain_name: String,

    /// Protocol version bound into the domain separator.
    pub domain_version: String,

    /// Largest accepted `data` payload in bytes.
    ///
    /// Larger records are rejected as invalid.
    pub max_data_len: usize,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            domain_version: DEFAULT_DOMAIN_VERSION.to_string(),
            max_data_len: DEFAULT_MAX_DATA_LEN,
        }
    }
}

impl AssociationConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_ASSOC_DOMAIN_NAME`: Protocol name (default: AssociatedAccounts)
    /// - `QC_ASSOC_DOMAIN_VERSION`: Protocol version (default: 1)
    /// - `QC_ASSOC_MAX_DATA_LEN`: Payload cap in bytes (default: 65536)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            domain_name: env::var("QC_ASSOC_DOMAIN_NAME").unwrap_or(defaults.domain_name),

            domain_version: env::var("QC_ASSOC_DOMAIN_VERSION")
                .unwrap_or(defaults.domain_version),

            max_data_len: env::var("QC_ASSOC_MAX_DATA_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_data_len),
        }
    }

    /// Canonicalizer bound to this configuration's domain.
    pub fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer::new(&self.domain_name, &self.domain_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssociationConfig::default();
        assert_eq!(config.domain_name, "AssociatedAccounts");
        assert_eq!(config.domain_version, "1");
        assert_eq!(config.max_data_len, 65536);
    }

    #[test]
    fn test_default_canonicalizer_matches_default_domain() {
        assert_eq!(
            AssociationConfig::default().canonicalizer(),
            Canonicalizer::default()
        );
    }
}
