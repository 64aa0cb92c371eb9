// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory Agent configuration.

use serde::{Deserialize, Serialize};
use slp::attributes::Attributes;
use slp::net::SLP_PORT;
use slp::scopes::Scopes;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Directory Agent configuration. Immutable once the server starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryAgentConfig {
    /// Interface IP literals to bind; wildcards (`0.0.0.0`, `::`) expand
    /// to the host's interface addresses at start.
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,

    /// SLP port for both UDP and TCP (default: 427). Port 0 binds an
    /// ephemeral port, which is only useful in tests.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Scopes this DA serves (default: DEFAULT).
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// DA attributes in the RFC 2608 Sec.5 string form; the tcp-port tag
    /// is merged in at start.
    #[serde(default)]
    pub attributes: String,

    /// Default language tag for unsolicited adverts.
    #[serde(default = "default_language")]
    pub language: String,

    /// Seconds between unsolicited DAAdverts (default: 10800, RFC 2608
    /// Sec.12.2); 0 disables them.
    #[serde(default = "default_advertisement_period")]
    pub advertisement_period_secs: u64,

    /// Seconds between expired-service purges; 0 disables the purger.
    #[serde(default = "default_purge_period")]
    pub expired_services_purge_period_secs: u64,
}

fn default_addresses() -> Vec<String> {
    vec!["0.0.0.0".to_string()]
}

fn default_port() -> u16 {
    SLP_PORT
}

fn default_scopes() -> Vec<String> {
    vec![slp::DEFAULT_SCOPE.to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_advertisement_period() -> u64 {
    10800
}

fn default_purge_period() -> u64 {
    60
}

impl Default for DirectoryAgentConfig {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            port: default_port(),
            scopes: default_scopes(),
            attributes: String::new(),
            language: default_language(),
            advertisement_period_secs: default_advertisement_period(),
            expired_services_purge_period_secs: default_purge_period(),
        }
    }
}

impl DirectoryAgentConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values; called by the server before binding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addresses.is_empty() {
            return Err(ConfigError::InvalidValue("addresses cannot be empty".into()));
        }
        for address in &self.addresses {
            address
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidValue(format!("bad address '{}'", address)))?;
        }
        if self.parsed_scopes().is_empty() {
            return Err(ConfigError::InvalidValue("scopes cannot be empty".into()));
        }
        Attributes::parse(&self.attributes)
            .map_err(|e| ConfigError::InvalidValue(format!("bad attributes: {}", e)))?;
        if self.language.trim().is_empty() {
            return Err(ConfigError::InvalidValue("language cannot be empty".into()));
        }
        Ok(())
    }

    pub fn parsed_scopes(&self) -> Scopes {
        Scopes::new(&self.scopes)
    }

    pub fn advertisement_period(&self) -> Option<Duration> {
        (self.advertisement_period_secs > 0)
            .then(|| Duration::from_secs(self.advertisement_period_secs))
    }

    pub fn purge_period(&self) -> Option<Duration> {
        (self.expired_services_purge_period_secs > 0)
            .then(|| Duration::from_secs(self.expired_services_purge_period_secs))
    }
}

/// Configuration error types.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {}", s),
            Self::Parse(s) => write!(f, "parse error: {}", s),
            Self::InvalidValue(s) => write!(f, "invalid value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DirectoryAgentConfig::default();
        assert_eq!(config.port, 427);
        assert_eq!(config.addresses, vec!["0.0.0.0"]);
        assert_eq!(config.advertisement_period_secs, 10800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_roundtrip_with_defaults() {
        let parsed: DirectoryAgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.port, 427);
        assert_eq!(parsed.parsed_scopes(), Scopes::default_scope());

        let parsed: DirectoryAgentConfig =
            serde_json::from_str(r#"{"port": 1427, "scopes": ["branch", "hq"]}"#).unwrap();
        assert_eq!(parsed.port, 1427);
        assert_eq!(parsed.scopes.len(), 2);
    }

    #[test]
    fn test_validation_rejects_bad_address() {
        let config = DirectoryAgentConfig {
            addresses: vec!["not-an-ip".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_scopes() {
        let config = DirectoryAgentConfig {
            scopes: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_attributes() {
        let config = DirectoryAgentConfig {
            attributes: "(tag=".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_periods_disable_at_zero() {
        let config = DirectoryAgentConfig {
            advertisement_period_secs: 0,
            expired_services_purge_period_secs: 0,
            ..Default::default()
        };
        assert!(config.advertisement_period().is_none());
        assert!(config.purge_period().is_none());
    }
}
