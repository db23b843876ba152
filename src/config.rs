//! Configuration management for px-session.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::MAX_TTL;

/// Default cookie carrying the session identifier.
pub const DEFAULT_COOKIE_NAME: &str = "px.session";
/// Default name under which handlers receive the session.
pub const DEFAULT_KEYWORD: &str = "session";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session engine configuration.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Session engine configuration section.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Directory holding one file per session.
    pub session_dir: PathBuf,
    /// Shared secret. When unset, tokens are stored unsigned.
    pub secret_key: Option<String>,
    /// Name of the cookie carrying the identifier.
    pub cookie_name: String,
    /// Cookie and session lifetime in seconds. When unset the session lives
    /// up to the 7-day ceiling and the cookie lasts for the browser session.
    ///
    /// Defaults to unset for every binding. Set it explicitly (for example
    /// `300`) to get a short rolling window.
    pub cookie_lifetime: Option<u64>,
    /// Binding name handlers use to request the session.
    pub keyword: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            session_dir: std::env::temp_dir(),
            secret_key: None,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_lifetime: None,
            keyword: DEFAULT_KEYWORD.to_string(),
        }
    }
}

impl std::fmt::Debug for SessionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSection")
            .field("session_dir", &self.session_dir)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("cookie_name", &self.cookie_name)
            .field("cookie_lifetime", &self.cookie_lifetime)
            .field("keyword", &self.keyword)
            .finish()
    }
}

impl SessionSection {
    /// Session window in seconds, bounded by the 7-day ceiling.
    pub fn ttl_seconds(&self) -> u64 {
        self.cookie_lifetime.map_or(MAX_TTL, |l| l.min(MAX_TTL))
    }

    /// Cookie `Max-Age`, or `None` for a browser-session cookie.
    pub fn max_age(&self) -> Option<u64> {
        self.cookie_lifetime.map(|l| l.min(MAX_TTL))
    }

    /// Secret as bytes.
    pub fn secret_bytes(&self) -> Option<&[u8]> {
        self.secret_key.as_deref().map(str::as_bytes)
    }

    /// Check the section for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() {
            return Err(ConfigError::invalid("cookie_name", "must not be empty"));
        }
        if !self.cookie_name.bytes().all(is_cookie_token_byte) {
            return Err(ConfigError::invalid(
                "cookie_name",
                "contains characters not allowed in a cookie name",
            ));
        }
        if self.keyword.trim().is_empty() {
            return Err(ConfigError::invalid("keyword", "must not be empty"));
        }
        if matches!(self.secret_key.as_deref(), Some("")) {
            return Err(ConfigError::invalid(
                "secret_key",
                "must not be empty; omit it for unsigned mode",
            ));
        }
        if self.cookie_lifetime == Some(0) {
            return Err(ConfigError::invalid("cookie_lifetime", "must be positive"));
        }
        Ok(())
    }
}

/// RFC 6265 `token` characters.
fn is_cookie_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

/// Reject two session bindings that share a keyword.
///
/// Run once at startup when several engines are wired into one application.
pub fn ensure_unique_keywords(sections: &[SessionSection]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for section in sections {
        if !seen.insert(section.keyword.as_str()) {
            return Err(ConfigError::ConflictingKeyword(section.keyword.clone()));
        }
    }
    Ok(())
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log filter (error, warn, info, debug, trace, or a directive).
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
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("PX_SESSION_DIR") {
            self.session.session_dir = PathBuf::from(dir);
        }

        if let Some(secret) = var("PX_SESSION_SECRET") {
            if !secret.is_empty() {
                self.session.secret_key = Some(secret);
            }
        }

        if let Some(name) = var("PX_SESSION_COOKIE_NAME") {
            self.session.cookie_name = name;
        }

        if let Some(lifetime) = var("PX_SESSION_COOKIE_LIFETIME") {
            if let Ok(lifetime) = lifetime.parse() {
                self.session.cookie_lifetime = Some(lifetime);
            }
        }

        if let Some(level) = var("PX_SESSION_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.dir {
            self.session.session_dir = dir.clone();
        }

        if let Some(ref secret) = args.secret {
            self.session.secret_key = Some(secret.clone());
        }

        if let Some(ref name) = args.cookie_name {
            self.session.cookie_name = name.clone();
        }

        if let Some(lifetime) = args.lifetime {
            self.session.cookie_lifetime = Some(lifetime);
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain and validate it.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);
        config.session.validate()?;

        Ok(config)
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
    /// A setting holds an unusable value.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    /// Two session bindings share a keyword.
    ConflictingKeyword(String),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::Invalid { field, reason } => write!(f, "invalid {}: {}", field, reason),
            Self::ConflictingKeyword(keyword) => write!(
                f,
                "another session binding already uses keyword '{}'",
                keyword
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
