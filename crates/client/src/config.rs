//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CLAUDE_API_KEY` - Anthropic API key; without it, keyword selection is used
//! - `CLAUDE_MODEL` - Claude model ID (default: claude-sonnet-4-20250514)
//! - `CLAUDE_API_URL` - Messages endpoint (default: Anthropic public API)
//! - `CLAUDE_MAX_TOKENS` - Completion budget for tool selection (default: 512)
//! - `SALES_SERVER_COMMAND` - Tool server executable (default: sales-assistant-server)
//! - `SALES_SERVER_ARGS` - Whitespace-separated arguments for the server
//! - `SALES_EXAMPLES_PATH` - YAML file with worked examples for the selection prompt
//! - `LOG_FORMAT` - `json` for structured logs
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::BTreeMap;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_SERVER_COMMAND: &str = "sales-assistant-server";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Fragments of the values people leave in `.env.example` files.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your", "changeme", "replace", "placeholder", "example", "xxx", "todo", "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Claude AI API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
    /// Messages API endpoint
    pub api_url: String,
    /// Maximum tokens per completion
    pub max_tokens: u32,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// How to start the tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    /// Executable name or path
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
}

impl Default for ServerCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_SERVER_COMMAND.to_string(),
            args: Vec::new(),
        }
    }
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Claude configuration; `None` selects tools by keyword
    pub claude: Option<ClaudeConfig>,
    /// Tool server process
    pub server: ServerCommand,
    /// Worked examples file; `None` uses the built-in examples
    pub examples_path: Option<PathBuf>,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the API key looks
    /// like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let claude = ClaudeConfig::from_env()?;
        let server = ServerCommand {
            program: get_env_or_default("SALES_SERVER_COMMAND", DEFAULT_SERVER_COMMAND),
            args: get_optional_env("SALES_SERVER_ARGS")
                .map(|args| args.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        };

        Ok(Self {
            claude,
            server,
            examples_path: get_optional_env("SALES_EXAMPLES_PATH").map(PathBuf::from),
            json_logs: get_optional_env("LOG_FORMAT")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns a reference to the Claude configuration, if available.
    #[must_use]
    pub const fn claude(&self) -> Option<&ClaudeConfig> {
        self.claude.as_ref()
    }
}

impl ClaudeConfig {
    /// Load Claude configuration from environment.
    ///
    /// Returns `Ok(None)` if `CLAUDE_API_KEY` is not set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("CLAUDE_API_KEY") else {
            return Ok(None);
        };
        check_api_key(&key, "CLAUDE_API_KEY")?;

        let max_tokens = get_optional_env("CLAUDE_MAX_TOKENS")
            .map(|v| {
                v.trim().parse::<u32>().map_err(|e| {
                    ConfigError::InvalidEnvVar("CLAUDE_MAX_TOKENS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_TOKENS);

        Ok(Some(Self {
            api_key: SecretString::from(key),
            model: get_env_or_default("CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            api_url: get_env_or_default("CLAUDE_API_URL", DEFAULT_CLAUDE_API_URL),
            max_tokens,
        }))
    }

    /// Non-secret prefix of the key, for log lines.
    #[must_use]
    pub fn key_hint(&self) -> String {
        let key = self.api_key.expose_secret();
        let prefix: String = key.chars().take(7).collect();
        format!("{prefix}…")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Shannon entropy of `s` in bits per character.
#[allow(clippy::cast_precision_loss)]
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    counts
        .values()
        .map(|&n| n as f64 / total as f64)
        .map(|p| -p * p.log2())
        .sum()
}

/// Reject an API key that is a leftover placeholder or too repetitive to be real.
fn check_api_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(var_name.to_string(), reason));

    let lower = key.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return insecure(format!("looks like a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(key);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "too repetitive ({entropy:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!((shannon_entropy("abab") - 1.0).abs() < 1e-9);
        assert!((shannon_entropy("abcd") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let err = check_api_key("your-anthropic-key", "CLAUDE_API_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));

        assert!(check_api_key("sk-ant-xxxxxxxx", "CLAUDE_API_KEY").is_err());
    }

    #[test]
    fn test_low_entropy_key_rejected() {
        assert!(check_api_key("aaaaaaaaaaaaaaaaaaaa", "CLAUDE_API_KEY").is_err());
    }

    #[test]
    fn test_realistic_key_accepted() {
        let key = "sk-ant-REDACTED";
        assert!(check_api_key(key, "CLAUDE_API_KEY").is_ok());
    }

    #[test]
    fn test_claude_config_debug_redacts_key() {
        let config = ClaudeConfig {
            api_key: SecretString::from("sk-ant-REDACTED"),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            api_url: DEFAULT_CLAUDE_API_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("kQ7vR2"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(config.key_hint(), "sk-ant-…");
    }

    #[test]
    fn test_server_command_default() {
        let command = ServerCommand::default();
        assert_eq!(command.program, "sales-assistant-server");
        assert!(command.args.is_empty());
    }
}
