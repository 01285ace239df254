//! Configuration management for policyscope.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::ProviderKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/policyscope/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Crawl identity and extraction limits
    pub scanning: ScanningConfig,
    /// Browser process settings
    pub browser: BrowserConfig,
    /// Analysis provider settings
    pub llm: LlmConfig,
    /// Scan record storage
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `POLICYSCOPE_HEADLESS`: Override browser headless mode (true/false)
    /// - `POLICYSCOPE_DATABASE_PATH`: Override the scan database location
    /// - `POLICYSCOPE_DEFAULT_PROVIDER`: Override the default provider tag
    /// - `GEMINI_API_KEY` / `OPENAI_API_KEY`: Engine-wide provider credentials
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored and logged.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("POLICYSCOPE_HEADLESS") {
            match val.parse() {
                Ok(headless) => {
                    self.browser.headless = headless;
                    tracing::debug!("Override browser.headless from env: {}", headless);
                }
                Err(_) => tracing::warn!("Ignoring invalid POLICYSCOPE_HEADLESS value: {}", val),
            }
        }

        if let Some(val) = lookup("POLICYSCOPE_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("POLICYSCOPE_DEFAULT_PROVIDER") {
            tracing::debug!("Override llm.default_provider from env: {}", val);
            self.llm.default_provider = val;
        }

        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.gemini_api_key = Some(key);
        }

        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.openai_api_key = Some(key);
        }
    }

    /// Check values that would otherwise fail at scan time.
    pub fn validate(&self) -> ConfigResult<()> {
        self.llm.default_provider()?;

        let timeouts = [
            ("scanning.robots_timeout_secs", self.scanning.robots_timeout_secs),
            ("browser.navigation_timeout_secs", self.browser.navigation_timeout_secs),
            ("browser.policy_timeout_secs", self.browser.policy_timeout_secs),
            ("llm.request_timeout_secs", self.llm.request_timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.scanning.robots_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scanning.robots_token".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/policyscope/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/policyscope`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    /// Resolve the scan database location.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("policyscope.db")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "policyscope", "policyscope").ok_or(ConfigError::NoConfigDir)
}

/// Crawl identity and extraction limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// User agent set on every page; identifies the scanner and links to bot info
    pub user_agent: String,
    /// Product token evaluated against robots.txt groups
    pub robots_token: String,
    /// Timeout for the robots.txt fetch
    pub robots_timeout_secs: u64,
    /// Maximum characters of privacy policy text kept in the signal bundle
    pub policy_text_limit: usize,
    /// Characters of policy text embedded in the analysis prompt
    pub policy_prompt_chars: usize,
}

impl ScanningConfig {
    /// Robots fetch timeout as a `Duration`.
    #[must_use]
    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            user_agent: "PolicyScopeBot/1.0 (+http://localhost:5173/bot-info) Mozilla/5.0 Compatible"
                .to_string(),
            robots_token: "PolicyScopeBot".to_string(),
            robots_timeout_secs: 5,
            policy_text_limit: 15_000,
            policy_prompt_chars: 2_000,
        }
    }
}

/// Browser process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Extra launch flags for unprivileged/container execution
    pub launch_args: Vec<String>,
    /// Hard bound on primary page navigation
    pub navigation_timeout_secs: u64,
    /// Bound on the privacy policy page navigation
    pub policy_timeout_secs: u64,
}

impl BrowserConfig {
    /// Primary navigation timeout as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Policy navigation timeout as a `Duration`.
    #[must_use]
    pub fn policy_timeout(&self) -> Duration {
        Duration::from_secs(self.policy_timeout_secs)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            launch_args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            navigation_timeout_secs: 45,
            policy_timeout_secs: 15,
        }
    }
}

/// Analysis provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider used when a request does not name one: `gemini` or `openai`
    pub default_provider: String,
    /// Gemini model name
    pub gemini_model: String,
    /// `OpenAI` model name
    pub openai_model: String,
    /// HTTP timeout for provider calls
    pub request_timeout_secs: u64,
    /// Engine-wide Gemini key (from environment, never written to disk)
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    /// Engine-wide `OpenAI` key (from environment, never written to disk)
    #[serde(skip)]
    pub openai_api_key: Option<String>,
}

impl LlmConfig {
    /// Parse the configured default provider tag.
    pub fn default_provider(&self) -> ConfigResult<ProviderKind> {
        self.default_provider
            .parse()
            .map_err(|e: crate::error::PolicyScopeError| ConfigError::InvalidValue {
                field: "llm.default_provider".to_string(),
                reason: e.to_string(),
            })
    }

    /// Engine-wide credential for a provider, if configured.
    #[must_use]
    pub fn api_key_for(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: "gemini".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            request_timeout_secs: 60,
            gemini_api_key: None,
            openai_api_key: None,
        }
    }
}

/// Scan record storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` file path; defaults to the XDG data directory
    pub path: Option<PathBuf>,
}
