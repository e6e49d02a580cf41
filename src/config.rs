//! Reference-data endpoint configuration.

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const ENV_BASE_URL: &str = "SUPABASE_URL";
pub const ENV_API_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_MACHINE_TYPE: &str = "BIDGUARD_MACHINE_TYPE";

pub const DEFAULT_MACHINE_TYPE: &str = "Retroescavadeira";
/// FIPE reference value for the default backhoe loader.
pub const DEFAULT_MACHINE_VALUE: f64 = 350_000.0;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("machine reference value must be a positive number, got {0}")]
    InvalidMachineValue(f64),
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub base_url: Url,
    pub api_key: String,
    /// Row key for the machine-spec lookup.
    pub machine_type: String,
    pub machine_value: f64,
    pub cache_ttl: Duration,
}

impl SourceConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            machine_value: DEFAULT_MACHINE_VALUE,
            cache_ttl: DEFAULT_CACHE_TTL,
        })
    }

    pub fn with_machine_type(mut self, machine_type: impl Into<String>) -> Self {
        self.machine_type = machine_type.into();
        self
    }

    pub fn with_machine_value(mut self, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidMachineValue(value));
        }
        self.machine_value = value;
        Ok(self)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
