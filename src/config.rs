//! Configuration file parser for ~/.config/gazette/config.toml.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged, since they are
//! usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `mailer_api_key`
pub const MAILER_KEY_ENV: &str = "GAZETTE_MAILER_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `mailer_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Relative paths resolve against the config directory.
    pub database_path: PathBuf,

    /// Directory uploaded media is written to.
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under.
    pub public_base_url: String,

    /// Public site root, used to build article links in newsletters.
    pub site_url: String,

    /// Mail API endpoint. Newsletter and contact mail are disabled when unset.
    pub mailer_endpoint: Option<String>,

    /// Bearer key for the mail API. `GAZETTE_MAILER_KEY` takes precedence.
    pub mailer_api_key: Option<String>,

    /// Where contact form messages are delivered.
    pub contact_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("gazette.db"),
            upload_dir: PathBuf::from("uploads"),
            public_base_url: "http://localhost:8080/uploads".to_string(),
            site_url: "http://localhost:8080".to_string(),
            mailer_endpoint: None,
            mailer_api_key: None,
            contact_address: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("upload_dir", &self.upload_dir)
            .field("public_base_url", &self.public_base_url)
            .field("site_url", &self.site_url)
            .field("mailer_endpoint", &self.mailer_endpoint)
            .field(
                "mailer_api_key",
                &self.mailer_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("contact_address", &self.contact_address)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "database_path",
        "upload_dir",
        "public_base_url",
        "site_url",
        "mailer_endpoint",
        "mailer_api_key",
        "contact_address",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check size before reading so a huge file is never pulled into memory
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            database = %config.database_path.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply environment overrides (`GAZETTE_MAILER_KEY`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(MAILER_KEY_ENV) {
            if !key.trim().is_empty() {
                self.mailer_api_key = Some(key);
            }
        }
        self
    }

    /// Resolve relative paths against `base` (the config directory)
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.database_path.is_relative() {
            self.database_path = base.join(&self.database_path);
        }
        if self.upload_dir.is_relative() {
            self.upload_dir = base.join(&self.upload_dir);
        }
        self
    }
}
