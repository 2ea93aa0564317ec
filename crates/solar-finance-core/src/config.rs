use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{SolarFinanceError, SolarFinanceResult};

pub const ENV_REMOTE_URL: &str = "SOLAR_FINANCE_REMOTE_URL";
pub const ENV_WARM_UP_TIMEOUT: &str = "SOLAR_FINANCE_WARMUP_TIMEOUT_SECS";
pub const ENV_TIMEOUT: &str = "SOLAR_FINANCE_TIMEOUT_SECS";
pub const ENV_FALLBACK: &str = "SOLAR_FINANCE_FALLBACK";

/// Engine selection and remote-call limits. Fixed when the orchestrator is built.
///
/// The remote engine is selected iff `remote_url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_warm_up_timeout_secs")]
    pub warm_up_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Re-run on the embedded engine after a remote timeout, connectivity or protocol
    /// failure.
    #[serde(default)]
    pub fallback_to_embedded: bool,
}

fn default_warm_up_timeout_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    90
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            warm_up_timeout_secs: default_warm_up_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            fallback_to_embedded: false,
        }
    }
}

impl EngineConfig {
    pub fn embedded() -> Self {
        Self::default()
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            remote_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Defaults overridden by any `SOLAR_FINANCE_*` variables that are set.
    pub fn from_env() -> SolarFinanceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SolarFinanceResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_REMOTE_URL) {
            let url = url.trim();
            if !url.is_empty() {
                config.remote_url = Some(url.to_string());
            }
        }
        if let Some(raw) = lookup(ENV_WARM_UP_TIMEOUT) {
            config.warm_up_timeout_secs = parse_secs(ENV_WARM_UP_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.timeout_secs = parse_secs(ENV_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FALLBACK) {
            config.fallback_to_embedded = parse_flag(ENV_FALLBACK, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SolarFinanceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SolarFinanceError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> SolarFinanceResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SolarFinanceError::Configuration(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SolarFinanceResult<()> {
        if let Some(url) = &self.remote_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SolarFinanceError::Configuration(format!(
                    "remote_url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.warm_up_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err(SolarFinanceError::Configuration(
                "timeouts must be at least one second".into(),
            ));
        }
        Ok(())
    }

    pub fn uses_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    pub fn warm_up_timeout(&self) -> Duration {
        Duration::from_secs(self.warm_up_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_secs(key: &str, raw: &str) -> SolarFinanceResult<u64> {
    raw.trim().parse().map_err(|_| {
        SolarFinanceError::Configuration(format!("{key} must be a whole number of seconds"))
    })
}

fn parse_flag(key: &str, raw: &str) -> SolarFinanceResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SolarFinanceError::Configuration(format!(
            "{key} must be true or false"
        ))),
    }
}
