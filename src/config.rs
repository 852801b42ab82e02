//! Configuration management for ride-request.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::provider::{FederatedProvider, SignInConfig, SimulatedRideService};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sign-in flow configuration.
    pub sign_in: SignInSection,
    /// Simulated provider configuration.
    pub simulation: SimulationSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Sign-in configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignInSection {
    /// Federated providers to offer (google, facebook, apple, github).
    pub federated_providers: Vec<String>,
    /// Offer an emailed one-time sign-in link.
    pub allow_passwordless_link: bool,
    /// Show only the passwordless link view.
    pub restrict_to_passwordless_view: bool,
    /// Show links to the other sign-in views.
    pub show_auxiliary_links: bool,
}

impl Default for SignInSection {
    fn default() -> Self {
        Self {
            federated_providers: vec![
                "google".to_string(),
                "facebook".to_string(),
                "apple".to_string(),
            ],
            allow_passwordless_link: true,
            restrict_to_passwordless_view: true,
            show_auxiliary_links: false,
        }
    }
}

/// Simulated provider section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    /// Latency of a search, in milliseconds.
    pub search_delay_ms: u64,
    /// Latency of a confirmation, in milliseconds.
    pub confirm_delay_ms: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            search_delay_ms: 1000,
            confirm_delay_ms: 1000,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var("RIDE_REQUEST_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        if let Ok(delay) = std::env::var("RIDE_REQUEST_SEARCH_DELAY_MS") {
            if let Ok(delay) = delay.parse() {
                self.simulation.search_delay_ms = delay;
            }
        }

        if let Ok(delay) = std::env::var("RIDE_REQUEST_CONFIRM_DELAY_MS") {
            if let Ok(delay) = delay.parse() {
                self.simulation.confirm_delay_ms = delay;
            }
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if args.instant {
            self.simulation.search_delay_ms = 0;
            self.simulation.confirm_delay_ms = 0;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to the identity provider's sign-in configuration.
    pub fn to_sign_in_config(&self) -> Result<SignInConfig, ConfigError> {
        let federated_providers = self
            .sign_in
            .federated_providers
            .iter()
            .map(|name| {
                name.parse::<FederatedProvider>()
                    .map_err(ConfigError::InvalidProvider)
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(SignInConfig {
            federated_providers,
            allow_passwordless_link: self.sign_in.allow_passwordless_link,
            restrict_to_passwordless_view: self.sign_in.restrict_to_passwordless_view,
            show_auxiliary_links: self.sign_in.show_auxiliary_links,
        })
    }

    /// Build the simulated ride service described by this configuration.
    pub fn to_ride_service(&self) -> SimulatedRideService {
        SimulatedRideService::new(
            Duration::from_millis(self.simulation.search_delay_ms),
            Duration::from_millis(self.simulation.confirm_delay_ms),
        )
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Unknown federated sign-in provider.
    InvalidProvider(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidProvider(name) => write!(f, "unknown sign-in provider: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simulation.search_delay_ms, 1000);
        assert_eq!(config.simulation.confirm_delay_ms, 1000);
        assert_eq!(config.sign_in.federated_providers.len(), 3);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_default_sign_in_matches_provider_default() {
        let config = Config::default();
        assert_eq!(config.to_sign_in_config().unwrap(), SignInConfig::default());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "sign_in": {
                "federated_providers": ["github"],
                "show_auxiliary_links": true
            },
            "simulation": {
                "search_delay_ms": 250,
                "confirm_delay_ms": 500
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.simulation.search_delay_ms, 250);
        assert_eq!(config.simulation.confirm_delay_ms, 500);

        let sign_in = config.to_sign_in_config().unwrap();
        assert_eq!(sign_in.federated_providers.len(), 1);
        assert!(sign_in
            .federated_providers
            .contains(&FederatedProvider::Github));
        assert!(sign_in.show_auxiliary_links);
        // Defaults fill the rest of the section.
        assert!(sign_in.allow_passwordless_link);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "logging": { "level": "debug" } }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.simulation.search_delay_ms, 1000);
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            instant: true,
            log_level: Some("trace".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.simulation.search_delay_ms, 0);
        assert_eq!(config.simulation.confirm_delay_ms, 0);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    fn test_invalid_provider() {
        let mut config = Config::default();
        config.sign_in.federated_providers.push("myspace".to_string());

        let err = config.to_sign_in_config().unwrap_err();
        assert!(err.to_string().contains("myspace"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"search_delay_ms\""));
        assert!(json.contains("\"federated_providers\""));
    }
}
