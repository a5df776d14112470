//! Configuration loading for the tactics dashboard
//!
//! The dashboard has a single, small TOML configuration file. Every value has
//! a compiled default, so a missing file is never fatal.
//!
//! # Resolution priority
//!
//! 1. Explicit path (command-line argument)
//! 2. Environment variable (`TACTICS_CONFIG`)
//! 3. Platform config directory (`~/.config/tactics/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A named file (priority 1 or 2) that exists but does not parse is an error.
//! A file found in the platform directory that does not parse only produces a
//! warning, since the user never asked for it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TACTICS_CONFIG";

/// Attribute set the correlation matrix is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationScope {
    /// Only the active attribute list (matrix is indexed by the selection)
    #[default]
    Active,
    /// Every analytical attribute in the registry, selection only emphasized
    All,
}

/// Initial values for the presentation-only plot parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayDefaults {
    /// Line opacity (0.0-1.0)
    pub opacity: f64,
    /// Curve smoothness (0.0-1.0)
    pub smoothness: f64,
    /// Edge bundling strength (0.0-1.0)
    pub bundling: f64,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            opacity: 0.1,
            smoothness: 0.0,
            bundling: 0.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dashboard configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Rows per table page
    pub page_size: usize,

    /// Cluster counts offered by the cluster selector (0 = no clustering)
    pub cluster_options: Vec<usize>,

    /// Upper bound for the cluster count
    pub max_clusters: usize,

    /// Event bus channel capacity
    pub event_capacity: usize,

    /// Attribute set used by the correlation matrix
    pub correlation_scope: CorrelationScope,

    /// Plot display parameter defaults
    pub display: DisplayDefaults,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            cluster_options: vec![0, 3, 4, 5, 6, 7, 8, 9, 10, 12],
            max_clusters: 12,
            event_capacity: 100,
            correlation_scope: CorrelationScope::default(),
            display: DisplayDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        if self.max_clusters == 0 {
            return Err(Error::Config("max_clusters must be at least 1".to_string()));
        }
        if let Some(k) = self.cluster_options.iter().find(|k| **k > self.max_clusters) {
            return Err(Error::Config(format!(
                "cluster option {} exceeds max_clusters {}",
                k, self.max_clusters
            )));
        }
        for (name, value) in [
            ("display.opacity", self.display.opacity),
            ("display.smoothness", self.display.smoothness),
            ("display.bundling", self.display.bundling),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{}: value {} out of range [0.0, 1.0]",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Command-line argument
    CommandLine,
    /// `TACTICS_CONFIG` environment variable
    Environment,
    /// Platform config directory
    PlatformDefault,
}

impl ConfigSource {
    /// True when the user named the file directly
    pub fn is_explicit(self) -> bool {
        !matches!(self, ConfigSource::PlatformDefault)
    }
}

/// Resolves the config file path following the priority order above
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    env_var_name: String,
}

impl ConfigResolver {
    /// Create a resolver for an optional command-line path
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Path and source of the highest-priority candidate, if any
    pub fn resolve(&self) -> Option<(PathBuf, ConfigSource)> {
        if let Some(path) = &self.cli_path {
            return Some((path.clone(), ConfigSource::CommandLine));
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some((PathBuf::from(path), ConfigSource::Environment));
            }
        }

        platform_config_path().map(|path| (path, ConfigSource::PlatformDefault))
    }

    /// Load the configuration, degrading to defaults where allowed
    pub fn load(&self) -> Result<DashboardConfig> {
        let Some((path, source)) = self.resolve() else {
            info!("No config file location available, using compiled defaults");
            return Ok(DashboardConfig::default());
        };

        if !path.exists() {
            if source.is_explicit() {
                warn!("Config file {} not found, using compiled defaults", path.display());
            } else {
                info!("No config file at {}, using compiled defaults", path.display());
            }
            return Ok(DashboardConfig::default());
        }

        match DashboardConfig::from_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if source.is_explicit() => Err(e),
            Err(e) => {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Ok(DashboardConfig::default())
            }
        }
    }
}

/// Platform config file location (`<config_dir>/tactics/config.toml`)
fn platform_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tactics").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.cluster_options[0], 0);
        assert_eq!(config.correlation_scope, CorrelationScope::Active);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = DashboardConfig::from_toml_str("page_size = 25\n").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_clusters, 12);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(DashboardConfig::from_toml_str("page_size = 0\n").is_err());
    }

    #[test]
    fn test_cluster_option_above_max_rejected() {
        let doc = "max_clusters = 4\ncluster_options = [0, 3, 5]\n";
        assert!(DashboardConfig::from_toml_str(doc).is_err());
    }

    #[test]
    fn test_display_out_of_range_rejected() {
        let doc = "[display]\nopacity = 1.5\n";
        assert!(DashboardConfig::from_toml_str(doc).is_err());
    }

    #[test]
    fn test_scope_parses_lowercase() {
        let config = DashboardConfig::from_toml_str("correlation_scope = \"all\"\n").unwrap();
        assert_eq!(config.correlation_scope, CorrelationScope::All);
    }
}
