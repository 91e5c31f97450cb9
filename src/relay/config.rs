//! Relay timing and HTTP configuration.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relay configuration, optionally loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Grace period before the form is submitted, so the success animation
    /// stays visible.
    #[serde(default = "default_submit_delay_ms")]
    pub submit_delay_ms: u64,

    /// Time after which the return is considered failed if the page is still
    /// around.
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,

    /// Timeout for backend and relying party requests.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Address shown when returning to the service failed.
    #[serde(default = "default_support_contact")]
    pub support_contact: String,
}

/// Lower bound for the submit delay.
pub const MIN_SUBMIT_DELAY_MS: u64 = 2_000;

/// Lower bound for the fallback timeout.
pub const MIN_FALLBACK_TIMEOUT_MS: u64 = 10_000;

fn default_submit_delay_ms() -> u64 {
    MIN_SUBMIT_DELAY_MS
}

fn default_fallback_timeout_ms() -> u64 {
    MIN_FALLBACK_TIMEOUT_MS
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_support_contact() -> String {
    "support@yivi.app".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            submit_delay_ms: default_submit_delay_ms(),
            fallback_timeout_ms: default_fallback_timeout_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            support_contact: default_support_contact(),
        }
    }
}

impl RelayConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read relay config: {:?}", path))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse relay config: {:?}", path))?;
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.submit_delay_ms < MIN_SUBMIT_DELAY_MS {
            return Err(format!(
                "submit_delay_ms must be at least {}",
                MIN_SUBMIT_DELAY_MS
            ));
        }

        if self.fallback_timeout_ms < MIN_FALLBACK_TIMEOUT_MS {
            return Err(format!(
                "fallback_timeout_ms must be at least {}",
                MIN_FALLBACK_TIMEOUT_MS
            ));
        }

        if self.fallback_timeout_ms <= self.submit_delay_ms {
            return Err("fallback_timeout_ms must exceed submit_delay_ms".to_string());
        }

        if self.http_timeout_secs == 0 {
            return Err("http_timeout_secs must be positive".to_string());
        }

        Ok(())
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// HTTP client used for all outgoing requests.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
            .context("Failed to create HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.submit_delay(), Duration::from_secs(2));
        assert_eq!(config.fallback_timeout(), Duration::from_secs(10));
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.support_contact, "support@yivi.app");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = RelayConfig::default();
        config.submit_delay_ms = 500;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.fallback_timeout_ms = 5_000;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.submit_delay_ms = 12_000;
        assert!(config.validate().is_err()); // submit after fallback

        let mut config = RelayConfig::default();
        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_timeout_ms": 15000}}"#).unwrap();

        let config = RelayConfig::load(file.path()).unwrap();
        assert_eq!(config.fallback_timeout_ms, 15_000);
        assert_eq!(config.submit_delay_ms, MIN_SUBMIT_DELAY_MS);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"submit_delay": 1}}"#).unwrap();
        assert!(RelayConfig::load(file.path()).is_err());
    }
}
