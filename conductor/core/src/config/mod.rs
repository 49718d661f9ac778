//! TOML Configuration File Support
//!
//! Configuration for the chat client, loaded from
//! `~/.config/streamchat/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`STREAMCHAT_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! api_key = "sk-..."
//! timeout_secs = 120
//!
//! [chat]
//! default_model = "gpt-5.1"
//! models = ["gpt-5.1", "gpt-5.1-codex"]
//! default_scenario = "Coding assistant"
//! continuation = true
//! log_dir = "/home/me/chatlogs"
//!
//! [scenarios]
//! "Code reviewer" = "You review patches and point out bugs."
//! ```

mod scenarios;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use scenarios::{Scenario, ScenarioCatalog, DEFAULT_MODELS, DEFAULT_SCENARIO};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Chat-completions URL
    pub endpoint: Option<String>,
    /// Bearer token
    pub api_key: Option<String>,
    /// Whole-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[chat]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Model selected at startup
    pub default_model: Option<String>,
    /// Models the user may pick from
    pub models: Option<Vec<String>>,
    /// Scenario selected at startup
    pub default_scenario: Option<String>,
    /// Whether continuation mode starts enabled
    pub continuation: Option<bool>,
    /// Directory receiving the daily chat logs
    pub log_dir: Option<PathBuf>,
}

/// Root TOML document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamchatToml {
    /// `[api]`
    pub api: ApiToml,
    /// `[chat]`
    pub chat: ChatToml,
    /// `[scenarios]`: extra name → system prompt entries
    pub scenarios: BTreeMap<String, String>,
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Effective configuration after all sources are merged
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Chat-completions URL
    pub endpoint: String,

    /// Bearer token; requests are refused while this is unset
    pub api_key: Option<String>,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// Models the user may pick from
    pub models: Vec<String>,

    /// Currently selected model
    pub model: String,

    /// Named system prompts
    pub scenarios: ScenarioCatalog,

    /// Currently selected scenario
    pub scenario: String,

    /// Whether new requests carry the transcript
    pub continuation: bool,

    /// Directory receiving the daily chat logs
    pub log_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            request_timeout: DEFAULT_TIMEOUT,
            models: DEFAULT_MODELS.iter().map(ToString::to_string).collect(),
            model: DEFAULT_MODELS[0].to_string(),
            scenarios: ScenarioCatalog::builtin(),
            scenario: DEFAULT_SCENARIO.to_string(),
            continuation: true,
            log_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Whether `model` is one of the offered models
    #[must_use]
    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// The model after the current one, wrapping around
    #[must_use]
    pub fn next_model(&self) -> Option<&str> {
        let names: Vec<&str> = self.models.iter().map(String::as_str).collect();
        scenarios::next_in(&names, &self.model)
    }

    /// The scenario after the current one, wrapping around
    #[must_use]
    pub fn next_scenario(&self) -> Option<&str> {
        self.scenarios.next_after(&self.scenario)
    }

    /// Check that the selected model and scenario exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::ValidationError(
                "model list is empty".to_string(),
            ));
        }
        if !self.has_model(&self.model) {
            return Err(ConfigError::ValidationError(format!(
                "model '{}' is not in the model list",
                self.model
            )));
        }
        if !self.scenarios.contains(&self.scenario) {
            return Err(ConfigError::ValidationError(format!(
                "unknown scenario '{}'",
                self.scenario
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/streamchat/config.toml` or
/// `~/.config/streamchat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("streamchat").join("config.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// If `path` is `None`, only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StreamchatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn apply_toml_config(config: &mut ChatConfig, toml: StreamchatToml) {
    if let Some(endpoint) = toml.api.endpoint {
        config.endpoint = endpoint;
    }
    if toml.api.api_key.is_some() {
        config.api_key = toml.api.api_key;
    }
    if let Some(secs) = toml.api.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    if let Some(models) = toml.chat.models {
        config.models = models;
        if !config.has_model(&config.model) {
            if let Some(first) = config.models.first() {
                config.model = first.clone();
            }
        }
    }
    if let Some(model) = toml.chat.default_model {
        config.model = model;
    }
    if let Some(scenario) = toml.chat.default_scenario {
        config.scenario = scenario;
    }
    if let Some(enabled) = toml.chat.continuation {
        config.continuation = enabled;
    }
    if toml.chat.log_dir.is_some() {
        config.log_dir = toml.chat.log_dir;
    }

    for (name, prompt) in toml.scenarios {
        if prompt.trim().is_empty() {
            tracing::warn!(scenario = %name, "Ignoring scenario with an empty prompt");
            continue;
        }
        config.scenarios.insert(name, prompt);
    }
}

/// Apply `STREAMCHAT_*` variables, read through `lookup`
fn apply_env_config(config: &mut ChatConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup("STREAMCHAT_ENDPOINT") {
        config.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(key) = lookup("STREAMCHAT_API_KEY") {
        config.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("STREAMCHAT_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.request_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(model) = lookup("STREAMCHAT_MODEL") {
        config.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(scenario) = lookup("STREAMCHAT_SCENARIO") {
        config.scenario = scenario;
        config.source = ConfigSource::Env;
    }
    if let Some(enabled) = lookup("STREAMCHAT_CONTINUATION") {
        config.continuation = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = lookup("STREAMCHAT_LOG_DIR") {
        config.log_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Model override
    pub model: Option<String>,

    /// Scenario override
    pub scenario: Option<String>,

    /// Continuation mode override
    pub continuation: Option<bool>,

    /// Chat log directory override
    pub log_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set scenario override
    #[must_use]
    pub fn with_scenario(mut self, scenario: String) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Set continuation override
    #[must_use]
    pub fn with_continuation(mut self, enabled: bool) -> Self {
        self.continuation = Some(enabled);
        self
    }

    /// Set chat log directory override
    #[must_use]
    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatConfig) {
        if self.endpoint.is_some()
            || self.model.is_some()
            || self.scenario.is_some()
            || self.continuation.is_some()
            || self.log_dir.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(ref scenario) = self.scenario {
            config.scenario = scenario.clone();
        }
        if let Some(enabled) = self.continuation {
            config.continuation = enabled;
        }
        if let Some(ref dir) = self.log_dir {
            config.log_dir = Some(dir.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> ChatConfig {
        let toml_config: StreamchatToml = toml::from_str(content).unwrap();
        let mut config = ChatConfig::default();
        apply_toml_config(&mut config, toml_config);
        config
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, "gpt-5.1");
        assert_eq!(config.models.len(), DEFAULT_MODELS.len());
        assert_eq!(config.scenario, DEFAULT_SCENARIO);
        assert!(config.continuation);
        assert!(config.api_key.is_none());
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("streamchat/config.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let config = parse(
            r#"
[api]
endpoint = "http://localhost:8080/v1/chat/completions"
api_key = "sk-test"
timeout_secs = 30

[chat]
models = ["local-a", "local-b"]
default_model = "local-b"
default_scenario = "Reviewer"
continuation = false
log_dir = "/tmp/logs"

[scenarios]
Reviewer = "Review the patch."
"#,
        );

        assert_eq!(config.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.models, vec!["local-a", "local-b"]);
        assert_eq!(config.model, "local-b");
        assert_eq!(config.scenarios.resolve("Reviewer"), Some("Review the patch."));
        assert!(config.scenarios.contains(DEFAULT_SCENARIO));
        assert!(!config.continuation);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_list_without_default_picks_first() {
        let config = parse("[chat]\nmodels = [\"only\"]\n");
        assert_eq!(config.model, "only");
    }

    #[test]
    fn test_empty_scenario_prompt_is_rejected() {
        let config = parse(
            "[chat]\ndefault_scenario = \"Blank\"\n\n[scenarios]\nBlank = \"\"\nShort = \"Be short.\"\n",
        );

        assert!(!config.scenarios.contains("Blank"));
        assert_eq!(config.scenarios.resolve("Short"), Some("Be short."));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[chat]\ndefault_model = \"gpt-5.1-codex\"\n")
            .unwrap();

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
        // Source may be Env if the developer has STREAMCHAT_* set
        assert!(matches!(
            config.source(),
            ConfigSource::File | ConfigSource::Env
        ));
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = load_config_from_path(Some(path)).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[chat\nbroken").unwrap();

        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = parse("[chat]\ndefault_model = \"gpt-5.1-codex\"\n");
        let env: HashMap<&str, &str> = [
            ("STREAMCHAT_MODEL", "claude-opus-4-5-20251101"),
            ("STREAMCHAT_CONTINUATION", "false"),
            ("STREAMCHAT_TIMEOUT_SECS", "not-a-number"),
            ("STREAMCHAT_LOG_DIR", "/var/chat"),
        ]
        .into_iter()
        .collect();

        apply_env_config(&mut config, |key| env.get(key).map(ToString::to_string));

        assert_eq!(config.model, "claude-opus-4-5-20251101");
        assert!(!config.continuation);
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/chat")));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = ChatConfig::default();
        apply_env_config(&mut config, |key| {
            (key == "STREAMCHAT_SCENARIO").then(|| "General assistant".to_string())
        });

        ConfigOverrides::new()
            .with_scenario("Chinese/English translator".to_string())
            .with_continuation(false)
            .apply(&mut config);

        assert_eq!(config.scenario, "Chinese/English translator");
        assert!(!config.continuation);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = ChatConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ChatConfig::default();
        config.model = "gpt-2".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = ChatConfig::default();
        config.scenario = "Poet".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cycling_models() {
        let mut config = ChatConfig::default();
        assert_eq!(config.next_model(), Some("gpt-5.1-codex"));
        config.model = "claude-haiku-4-5-20251001".to_string();
        assert_eq!(config.next_model(), Some("gpt-5.1"));
        assert_eq!(config.next_scenario(), Some("General assistant"));
    }
}
