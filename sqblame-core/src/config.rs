//! Configuration management for sqblame
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (SQBLAME_*)
//! 3. Config file (~/.config/sqblame/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::output::OutputFormat;
use crate::query::ProjectKeyParam;
use crate::{Error, Result};

/// Largest page size the issue search endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 500;

/// Server connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Issues requested per search page (capped at 500)
    pub page_size: u32,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Accept invalid TLS certificates
    pub insecure: bool,

    /// Search parameter the UI's `id` maps to
    pub project_param: ProjectKeyParam,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(60),
            insecure: false,
            project_param: ProjectKeyParam::default(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Fixed format; derived from the output path when unset
    pub format: Option<OutputFormat>,

    /// Print the committer summary after exporting
    pub summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            summary: true,
        }
    }
}

/// Blame settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlameConfig {
    /// Fetch per-line SCM blame
    pub enabled: bool,
}

impl Default for BlameConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub output: OutputConfig,
    pub blame: BlameConfig,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub page_size: Option<u32>,
    pub timeout: Option<Duration>,
    pub insecure: bool,
    pub project_param: Option<ProjectKeyParam>,
    pub format: Option<OutputFormat>,
    pub no_blame: bool,
    pub quiet: bool,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/sqblame/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sqblame").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - SQBLAME_PAGE_SIZE: issues per search page
    /// - SQBLAME_TIMEOUT: per-request timeout, e.g. `30s`
    /// - SQBLAME_INSECURE: `1`/`true` to skip TLS verification
    /// - SQBLAME_PROJECT_PARAM: `projects` or `componentKeys`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("SQBLAME_PAGE_SIZE") {
            match value.trim().parse() {
                Ok(size) => self.server.page_size = size,
                Err(_) => warn!(%value, "Ignoring invalid SQBLAME_PAGE_SIZE"),
            }
        }

        if let Some(value) = lookup("SQBLAME_TIMEOUT") {
            match humantime_serde::re::humantime::parse_duration(value.trim()) {
                Ok(timeout) => self.server.timeout = timeout,
                Err(_) => warn!(%value, "Ignoring invalid SQBLAME_TIMEOUT"),
            }
        }

        if let Some(value) = lookup("SQBLAME_INSECURE") {
            self.server.insecure = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        if let Some(value) = lookup("SQBLAME_PROJECT_PARAM") {
            match value.parse() {
                Ok(param) => self.server.project_param = param,
                Err(_) => warn!(%value, "Ignoring invalid SQBLAME_PROJECT_PARAM"),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(size) = overrides.page_size {
            self.server.page_size = size;
        }
        if let Some(timeout) = overrides.timeout {
            self.server.timeout = timeout;
        }
        if overrides.insecure {
            self.server.insecure = true;
        }
        if let Some(param) = overrides.project_param {
            self.server.project_param = param;
        }
        if let Some(format) = overrides.format {
            self.output.format = Some(format);
        }
        if overrides.no_blame {
            self.blame.enabled = false;
        }
        if overrides.quiet {
            self.output.summary = false;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(overrides: &ConfigOverrides) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(overrides))
    }

    /// Page size clamped to what the server accepts
    pub fn effective_page_size(&self) -> u32 {
        self.server.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}
