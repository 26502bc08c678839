use anyhow::Context as _;
use commonware_utils::union;
use lottery_types::{DEFAULT_TICKET_PRICE, NAMESPACE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Suffix appended to the namespace when signing certificates.
pub const CERTIFICATE_SUFFIX: &[u8] = b"_CERT";

fn default_ticket_price() -> u64 {
    DEFAULT_TICKET_PRICE
}

fn default_namespace() -> String {
    String::from_utf8_lossy(NAMESPACE).into_owned()
}

/// Configuration for the [crate::Reducer].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReductionConfig {
    #[serde(default = "default_ticket_price")]
    pub ticket_price: u64,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("ticket_price must be non-zero")]
    ZeroTicketPrice,
    #[error("namespace must not be empty")]
    EmptyNamespace,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            ticket_price: default_ticket_price(),
            namespace: default_namespace(),
        }
    }
}

impl ReductionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticket_price == 0 {
            return Err(ConfigError::ZeroTicketPrice);
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(())
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_yaml(&contents).context("Could not parse config file")
    }

    /// Namespace under which certificates are attested.
    pub fn certificate_namespace(&self) -> Vec<u8> {
        union(self.namespace.as_bytes(), CERTIFICATE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReductionConfig::default();
        assert_eq!(config.ticket_price, 1);
        assert_eq!(config.namespace, "_LOTTERY");
        assert_eq!(config.certificate_namespace(), b"_LOTTERY_CERT".to_vec());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_from_yaml_fills_defaults() {
        let config = ReductionConfig::from_yaml("ticket_price: 5\n").unwrap();
        assert_eq!(config.ticket_price, 5);
        assert_eq!(config.namespace, "_LOTTERY");

        let config = ReductionConfig::from_yaml("namespace: _TEST\n").unwrap();
        assert_eq!(config.ticket_price, 1);
        assert_eq!(config.certificate_namespace(), b"_TEST_CERT".to_vec());
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        assert!(matches!(
            ReductionConfig::from_yaml("ticket_price: 0\n"),
            Err(ConfigError::ZeroTicketPrice)
        ));
        assert!(matches!(
            ReductionConfig::from_yaml("namespace: ''\n"),
            Err(ConfigError::EmptyNamespace)
        ));
        assert!(matches!(
            ReductionConfig::from_yaml("ticket_price: [1]\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReductionConfig::load(Path::new("/nonexistent/lottery.yaml")).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }
}
