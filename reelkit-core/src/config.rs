use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::provider::StaticProviderConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub player: PlayerConfig,
    pub provider_test: ProviderTestConfig,
    pub resolver: ResolverConfig,
    pub providers: Vec<StaticProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Player session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Owner of persisted watch progress
    pub owner_id: String,
    /// Fraction of the duration after which a film counts as watched
    pub completion_ratio: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            owner_id: "local".to_string(),
            completion_ratio: 0.95,
        }
    }
}

/// Provider test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderTestConfig {
    /// Pause between two test cases, in milliseconds
    pub case_delay_ms: u64,
}

impl Default for ProviderTestConfig {
    fn default() -> Self {
        Self { case_delay_ms: 250 }
    }
}

impl ProviderTestConfig {
    #[must_use]
    pub const fn case_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.case_delay_ms)
    }
}

/// Link resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound for a single provider `get_links` call
    pub timeout_seconds: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { timeout_seconds: 60 }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (REELKIT_LOGGING__LEVEL, etc.)
        builder = builder.add_source(
            Environment::with_prefix("REELKIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check the configuration, returning every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }

        if !(self.player.completion_ratio > 0.0 && self.player.completion_ratio <= 1.0) {
            errors.push(format!(
                "player.completion_ratio must be in (0, 1], got {}",
                self.player.completion_ratio
            ));
        }

        if self.player.owner_id.trim().is_empty() {
            errors.push("player.owner_id must not be empty".to_string());
        }

        if self.resolver.timeout_seconds == 0 {
            errors.push("resolver.timeout_seconds must be greater than 0".to_string());
        }

        let mut ids = HashSet::new();
        for provider in &self.providers {
            if provider.id.as_str().is_empty() {
                errors.push(format!("provider \"{}\" has an empty id", provider.name));
            } else if !ids.insert(provider.id.clone()) {
                errors.push(format!("duplicate provider id \"{}\"", provider.id));
            }

            if let Some(test_film) = &provider.test_film_id {
                if !provider.films.iter().any(|f| f.film.id() == test_film) {
                    errors.push(format!(
                        "provider \"{}\": test_film_id \"{}\" is not one of its films",
                        provider.id, test_film
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider_test.case_delay_ms, 250);
        assert_eq!(config.player.owner_id, "local");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        config.player.completion_ratio = 1.5;
        config.resolver.timeout_seconds = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
logging:
  level: debug
  format: json
provider_test:
  case_delay_ms: 10
providers:
  - id: demo
    name: Demo
    films:
      - film:
          kind: movie
          id: "1"
          provider_id: demo
          title: Test Movie
        streams:
          - url: https://cdn.example.com/a.m3u8
            label: 720p
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.provider_test.case_delay_ms, 10);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].films[0].film.title(), "Test Movie");
        assert!(config.validate().is_ok());
    }
}
