/*!
 * Configuration support for the eligibility client
 *
 * Provides the client configuration loaded from a TOML file or from
 * environment variables, and turns it into the per-payer transaction
 * context the builder and transport need.
 */

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ENDPOINT;
use crate::data_types::{Credentials, Environment, Npi, TransactionContext};
use crate::error::{EdiError, Result};
use crate::payer::PayerProfile;

/// Client configuration for eligibility checking
///
/// Credentials live in a nested table so the TOML file mirrors the
/// structure, and the password stays out of `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Clearinghouse endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Submitter's trading partner number
    #[serde(default)]
    pub trading_partner: String,

    /// Billing provider's 10-digit NPI
    #[serde(default)]
    pub provider_npi: String,

    /// Provider last name, or organization name for group billing
    #[serde(default)]
    pub provider_last_name: String,

    /// Provider first name; set only for individual providers
    #[serde(default)]
    pub provider_first_name: Option<String>,

    /// Which clearinghouse environment to route inquiries to
    #[serde(default)]
    pub environment: Environment,

    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Directory for request/response snapshots (None disables snapshots)
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,

    /// Clearinghouse account credentials
    #[serde(default)]
    pub credentials: Credentials,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            trading_partner: String::new(),
            provider_npi: String::new(),
            provider_last_name: String::new(),
            provider_first_name: None,
            environment: Environment::default(),
            timeout_seconds: default_timeout_seconds(),
            snapshot_dir: None,
            credentials: Credentials::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `UHIN_ENDPOINT`: clearinghouse endpoint URL
    /// - `UHIN_USERNAME` / `UHIN_PASSWORD`: account credentials
    /// - `UHIN_TRADING_PARTNER`: submitter trading partner number
    /// - `PROVIDER_NPI`: billing provider NPI
    /// - `PROVIDER_LAST_NAME` / `PROVIDER_FIRST_NAME`: provider name
    /// - `UHIN_ENVIRONMENT`: "production" or "test"
    /// - `UHIN_TIMEOUT_SECONDS`: request timeout
    /// - `UHIN_OUTPUT_DIR`: snapshot directory
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("UHIN_ENDPOINT") {
            config.endpoint = val;
        }
        if let Ok(val) = std::env::var("UHIN_USERNAME") {
            config.credentials.username = val;
        }
        if let Ok(val) = std::env::var("UHIN_PASSWORD") {
            config.credentials.password = val;
        }
        if let Ok(val) = std::env::var("UHIN_TRADING_PARTNER") {
            config.trading_partner = val;
        }
        if let Ok(val) = std::env::var("PROVIDER_NPI") {
            config.provider_npi = val;
        }
        if let Ok(val) = std::env::var("PROVIDER_LAST_NAME") {
            config.provider_last_name = val;
        }
        if let Ok(val) = std::env::var("PROVIDER_FIRST_NAME") {
            if !val.is_empty() {
                config.provider_first_name = Some(val);
            }
        }
        if let Ok(val) = std::env::var("UHIN_ENVIRONMENT") {
            config.environment = match val.to_lowercase().as_str() {
                "test" => Environment::Test,
                _ => Environment::Production,
            };
        }
        if let Ok(val) = std::env::var("UHIN_TIMEOUT_SECONDS") {
            if let Ok(seconds) = val.parse() {
                config.timeout_seconds = seconds;
            }
        }
        if let Ok(val) = std::env::var("UHIN_OUTPUT_DIR") {
            config.snapshot_dir = Some(PathBuf::from(val));
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EdiError::io_at(e, path.as_ref()))?;
        let config: Self = toml::from_str(&contents).map_err(|e| EdiError::Configuration {
            message: format!("Failed to parse config file: {}", e),
            suggestion: Some("Check that the file is valid TOML format".to_string()),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| EdiError::Configuration {
            message: format!("Failed to serialize config: {}", e),
            suggestion: None,
        })?;
        std::fs::write(path.as_ref(), contents).map_err(|e| EdiError::io_at(e, path.as_ref()))?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/edi270/config.toml` on Unix-like systems
    /// or `%APPDATA%\edi270\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "edi270")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::from_file(&config_path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }

    /// Names of required fields that are not populated
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.credentials.username.is_empty() {
            missing.push("username");
        }
        if self.credentials.password.is_empty() {
            missing.push("password");
        }
        if self.trading_partner.is_empty() {
            missing.push("trading_partner");
        }
        if self.provider_npi.is_empty() {
            missing.push("provider_npi");
        }
        missing
    }

    /// Whether every field a live inquiry needs is populated
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Build the transaction context for inquiries to one payer
    ///
    /// An invalid NPI is a hard error since the payer would reject the
    /// inquiry anyway. Missing credentials only warn, so requests can
    /// still be built and inspected offline.
    pub fn context_for(&self, profile: &PayerProfile) -> Result<TransactionContext> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(
                fields = ?missing,
                "configuration is incomplete, the clearinghouse may reject the request"
            );
        }

        let provider_npi = Npi::new(self.provider_npi.clone())?;

        Ok(TransactionContext {
            trading_partner: self.trading_partner.clone(),
            receiver_id: profile.receiver_for(self.environment).to_string(),
            provider_npi,
            provider_last_name: self.provider_last_name.clone(),
            provider_first_name: self.provider_first_name.clone(),
            environment: self.environment,
            credentials: self.credentials.clone(),
        })
    }
}

/// Builder for customizing configuration
pub struct ConfigBuilder {
    config: ClientConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the clearinghouse endpoint URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the account username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.credentials.username = username.into();
        self
    }

    /// Set the account password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.credentials.password = password.into();
        self
    }

    /// Set the submitter trading partner number
    pub fn trading_partner(mut self, trading_partner: impl Into<String>) -> Self {
        self.config.trading_partner = trading_partner.into();
        self
    }

    /// Set the billing provider NPI
    pub fn provider_npi(mut self, npi: impl Into<String>) -> Self {
        self.config.provider_npi = npi.into();
        self
    }

    /// Set the provider last name or organization name
    pub fn provider_last_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_last_name = name.into();
        self
    }

    /// Set the provider first name, marking the provider as an individual
    pub fn provider_first_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_first_name = Some(name.into());
        self
    }

    /// Set the clearinghouse environment
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Set the HTTP timeout in seconds
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set the snapshot directory
    pub fn snapshot_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.snapshot_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payer;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.environment, Environment::Production);
        assert!(config.snapshot_dir.is_none());
        assert!(!config.is_complete());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .endpoint("https://example.org/core")
            .username("clinic_user")
            .password("hunter2")
            .trading_partner("HT009582-001")
            .provider_npi("1275348807")
            .provider_last_name("MONTOYA")
            .provider_first_name("JEREMY")
            .environment(Environment::Test)
            .timeout_seconds(10)
            .build();

        assert_eq!(config.endpoint, "https://example.org/core");
        assert_eq!(config.credentials.username, "clinic_user");
        assert_eq!(config.trading_partner, "HT009582-001");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.timeout_seconds, 10);
        assert!(config.is_complete());
    }

    #[test]
    fn test_missing_fields() {
        let config = ConfigBuilder::new().username("clinic_user").build();
        let missing = config.missing_fields();

        assert!(!missing.contains(&"username"));
        assert!(missing.contains(&"password"));
        assert!(missing.contains(&"trading_partner"));
        assert!(missing.contains(&"provider_npi"));
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("edi270.toml");

        let config = ConfigBuilder::new()
            .endpoint("https://example.org/core")
            .username("clinic_user")
            .password("hunter2")
            .trading_partner("HT009582-001")
            .provider_npi("1275348807")
            .provider_last_name("MONTOYA")
            .environment(Environment::Test)
            .snapshot_dir(dir.path())
            .build();

        config.save(&path).expect("save should succeed");
        let restored = ClientConfig::from_file(&path).expect("load should succeed");

        assert_eq!(restored.endpoint, "https://example.org/core");
        assert_eq!(restored.credentials.username, "clinic_user");
        assert_eq!(restored.credentials.password, "hunter2");
        assert_eq!(restored.environment, Environment::Test);
        assert_eq!(restored.timeout_seconds, 30);
        assert_eq!(restored.snapshot_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_from_file_rejects_invalid_toml() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "endpoint = [not toml").expect("write");

        match ClientConfig::from_file(&path) {
            Err(EdiError::Configuration { message, .. }) => {
                assert!(message.contains("parse"));
            }
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_context_for_profile_uses_environment_receiver() {
        let config = ConfigBuilder::new()
            .username("clinic_user")
            .password("hunter2")
            .trading_partner("HT009582-001")
            .provider_npi("1275348807")
            .provider_last_name("MONTOYA")
            .provider_first_name("JEREMY")
            .environment(Environment::Test)
            .build();

        let profile = payer::get_payer("utah_medicaid").expect("profile should exist");
        let context = config.context_for(profile).expect("context should build");

        assert_eq!(context.receiver_id, profile.receiver_for(Environment::Test));
        assert_eq!(context.provider_npi.as_str(), "1275348807");
        assert!(context.provider_is_individual());
        assert_eq!(context.environment, Environment::Test);
    }

    #[test]
    fn test_context_for_rejects_invalid_npi() {
        let config = ConfigBuilder::new()
            .username("clinic_user")
            .password("hunter2")
            .trading_partner("HT009582-001")
            .provider_npi("12345")
            .provider_last_name("MONTOYA")
            .build();

        let profile = payer::get_payer("utah_medicaid").expect("profile should exist");
        match config.context_for(profile) {
            Err(EdiError::InvalidNpi { npi, .. }) => assert_eq!(npi, "12345"),
            other => panic!("expected InvalidNpi, got {:?}", other),
        }
    }
}
