//! TOML Configuration File Support
//!
//! Configuration lives at `~/.config/agent-deck/deck.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/agent-deck/deck.toml` (typically `~/.config/agent-deck/deck.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [composer]
//! max_attachments = 10
//!
//! [model]
//! id = "claude-3-haiku-20240307"
//!
//! [task]
//! max_requests_per_task = 50
//!
//! [[models]]
//! id = "local-llava"
//! supports_images = true
//! max_tokens = 4096
//! input_price = 0.0
//! output_price = 0.0
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::error::ConfigError;

use crate::attachments::DEFAULT_MAX_ATTACHMENTS;
use crate::models::{ModelCatalog, ModelInfo, DEFAULT_MODEL_ID};

/// Default API request budget per task
pub const DEFAULT_MAX_REQUESTS_PER_TASK: usize = 20;

/// Environment variable for the active model
pub const ENV_MODEL: &str = "DECK_MODEL";
/// Environment variable for the attachment cap
pub const ENV_MAX_ATTACHMENTS: &str = "DECK_MAX_ATTACHMENTS";
/// Environment variable for the request budget
pub const ENV_MAX_REQUESTS: &str = "DECK_MAX_REQUESTS";

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

/// `[composer]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerToml {
    /// Maximum staged images per message
    pub max_attachments: Option<usize>,
}

/// `[model]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelToml {
    /// Active model id
    pub id: Option<String>,
}

/// `[task]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskToml {
    /// API request budget per task
    pub max_requests_per_task: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckToml {
    /// Composer section
    pub composer: ComposerToml,
    /// Model section
    pub model: ModelToml,
    /// Task section
    pub task: TaskToml,
    /// Extra catalog entries
    pub models: Vec<ModelInfo>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for a chat surface
#[derive(Clone, Debug)]
pub struct DeckConfig {
    /// Model assumed until a snapshot names one
    pub model_id: String,
    /// Maximum staged images per message
    pub max_attachments: usize,
    /// API request budget per task
    pub max_requests_per_task: usize,
    /// Catalog additions from the config file
    pub models: Vec<ModelInfo>,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_attachments: DEFAULT_MAX_ATTACHMENTS,
            max_requests_per_task: DEFAULT_MAX_REQUESTS_PER_TASK,
            models: Vec::new(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl DeckConfig {
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

    /// Built-in models plus any configured additions
    #[must_use]
    pub fn catalog(&self) -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.extend(self.models.iter().cloned());
        catalog
    }

    /// Reject values the surface cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for zero caps or an empty model id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attachments == 0 {
            return Err(ConfigError::ValidationError(
                "max_attachments must be at least 1".to_string(),
            ));
        }
        if self.max_requests_per_task == 0 {
            return Err(ConfigError::ValidationError(
                "max_requests_per_task must be at least 1".to_string(),
            ));
        }
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("agent-deck").join("deck.toml"))
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// result fails validation. A missing config file is not an error.
pub fn load_config() -> Result<DeckConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the result fails
/// validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<DeckConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<DeckConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = DeckConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: DeckToml = toml::from_str(&toml_content)?;
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

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut DeckConfig, toml: DeckToml) {
    if let Some(max) = toml.composer.max_attachments {
        config.max_attachments = max;
    }
    if let Some(id) = toml.model.id {
        config.model_id = id;
    }
    if let Some(max) = toml.task.max_requests_per_task {
        config.max_requests_per_task = max;
    }
    config.models = toml.models;
}

fn apply_env_config<F>(config: &mut DeckConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = env(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
        config.model_id = model;
        config.source = ConfigSource::Env;
    }
    if let Some(value) = env(ENV_MAX_ATTACHMENTS) {
        match value.parse::<usize>() {
            Ok(max) => {
                config.max_attachments = max;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(var = ENV_MAX_ATTACHMENTS, %value, "ignoring invalid value"),
        }
    }
    if let Some(value) = env(ENV_MAX_REQUESTS) {
        match value.parse::<usize>() {
            Ok(max) => {
                config.max_requests_per_task = max;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(var = ENV_MAX_REQUESTS, %value, "ignoring invalid value"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Model override
    pub model_id: Option<String>,
    /// Attachment cap override
    pub max_attachments: Option<usize>,
    /// Request budget override
    pub max_requests_per_task: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set model override
    #[must_use]
    pub fn with_model_id(mut self, model: String) -> Self {
        self.model_id = Some(model);
        self
    }

    /// Set attachment cap override
    #[must_use]
    pub fn with_max_attachments(mut self, max: usize) -> Self {
        self.max_attachments = Some(max);
        self
    }

    /// Set request budget override
    #[must_use]
    pub fn with_max_requests_per_task(mut self, max: usize) -> Self {
        self.max_requests_per_task = Some(max);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is out of range.
    pub fn apply(&self, config: &mut DeckConfig) -> Result<(), ConfigError> {
        if self.model_id.is_some()
            || self.max_attachments.is_some()
            || self.max_requests_per_task.is_some()
        {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref model) = self.model_id {
            config.model_id = model.clone();
        }
        if let Some(max) = self.max_attachments {
            config.max_attachments = max;
        }
        if let Some(max) = self.max_requests_per_task {
            config.max_requests_per_task = max;
        }
        config.validate()
    }
}
