//! Configuration types for the search service.

use astrobio_search::config::default_nasa_sources;
use astrobio_search::sources::default_datasets;
use astrobio_search::{ApiKind, DatasetFile, SearchConfig, SourceConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Environment variables that replace the endpoint base of a NASA API.
pub const ENDPOINT_OVERRIDES: &[(&str, ApiKind)] = &[
    ("NASA_OSDR_MAIN_API_URL", ApiKind::Osdr),
    ("NASA_OSDR_BIODATA_API_URL", ApiKind::OpenData),
    ("NASA_NTRS_API_URL", ApiKind::Ntrs),
    ("NASA_NSLSL_API_URL", ApiKind::Nslsl),
];

/// Environment variable that sets the API key.
pub const API_KEY_ENV: &str = "ASTROBIO_API_KEY";

/// Top-level configuration for the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Aggregation limits, cache and HTTP client settings.
    pub search: SearchConfig,
    /// Local CSV datasets.
    pub local: LocalConfig,
    /// External NASA API sources, in merge order.
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            local: LocalConfig::default(),
            sources: default_nasa_sources(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (0 = auto-assign).
    pub port: u16,
    /// When set, `/api/*` requests must carry this value in `x-api-key`.
    pub api_key: Option<String>,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Service name reported by `/health`.
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            api_key: None,
            cors_origins: [
                "http://localhost:3000",
                "http://localhost:5173",
                "http://localhost:5174",
                "http://localhost:4173",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:5173",
                "http://127.0.0.1:5174",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            service_name: "NASA Space Biology Search API".to_owned(),
        }
    }
}

/// Local dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// CSV files to load at startup. Missing files are skipped.
    pub datasets: Vec<DatasetFile>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/astrobio/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("astrobio").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("astrobio")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/astrobio-config/config.toml")
        }
    }

    /// Load from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Endpoint variables replace the endpoint base of every source with the
    /// matching API, keeping its query-string template.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for &(var, api) in ENDPOINT_OVERRIDES {
            let Some(base) = lookup(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            for source in self.sources.iter_mut().filter(|s| s.api == api) {
                tracing::info!(source = %source.name, var, "endpoint overridden from environment");
                *source = source.clone().with_endpoint_base(base.trim());
            }
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.server.api_key = Some(key);
        }
    }

    /// Validate the full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an empty host or API key, or any
    /// invalid search or source setting.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::Config("server.host must not be empty".into()));
        }
        if self.server.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(AppError::Config("server.api_key must not be blank".into()));
        }
        self.search
            .validate(&self.sources)
            .map_err(|e| AppError::Config(e.to_string()))
    }
}
