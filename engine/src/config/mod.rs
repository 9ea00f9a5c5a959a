//! Configuration management
//!
//! This module handles loading, validation, and management of the Axon
//! configuration. Configuration is stored in TOML format at ~/.axon/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory, staging directory, default language
//! - **llm**: Chat model provider, model name and temperature
//! - **search**: Premium (Tavily) and general (DuckDuckGo) search settings
//! - **rate_limits**: Calls per minute for each shared external service
//! - **agent**: Tool agent step limit
//! - **translation**: Translation API endpoint
//! - **audio**: Audio staging and transcription settings
//! - **context**: Uploaded-document context assembly
//!
//! API keys are never stored here; see `crate::secrets`.
//!
//! # Examples
//!
//! ```no_run
//! use axon_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Provider: {}", config.llm.provider);
//! # Ok(())
//! # }
//! ```

use axon_sdk::errors::TutorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Chat model configuration
    pub llm: LLMConfig,

    /// Search provider configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Outbound rate limits
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Tool agent settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Audio transcription settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Document context settings
    #[serde(default)]
    pub context: ContextConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory uploaded documents are staged in (supports ~ expansion)
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Language assumed when a request does not name one
    #[serde(default = "default_language")]
    pub default_language: String,
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider (groq, openai)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name; empty selects the provider's default model
    #[serde(default)]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Groq API base URL
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    /// OpenAI API base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tavily API base URL
    #[serde(default = "default_tavily_base_url")]
    pub tavily_base_url: String,

    /// Maximum results requested from premium search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Domains premium search is restricted to
    #[serde(default = "default_include_domains")]
    pub include_domains: Vec<String>,

    /// DuckDuckGo instant-answer API base URL
    #[serde(default = "default_duckduckgo_base_url")]
    pub duckduckgo_base_url: String,
}

/// Calls per minute for each external service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_web_search_rpm")]
    pub web_search: usize,

    #[serde(default = "default_premium_search_rpm")]
    pub premium_search: usize,

    #[serde(default = "default_translation_rpm")]
    pub translation: usize,
}

/// Tool agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum think-act-observe steps per question
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Keep the agent's own transcript between questions
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
}

/// Translation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Google Cloud Translation v2 base URL
    #[serde(default = "default_translation_base_url")]
    pub base_url: String,
}

/// Audio transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Directory audio uploads are staged in (supports ~ expansion)
    #[serde(default = "default_audio_dir")]
    pub upload_dir: PathBuf,

    /// Default local model size (tiny, base, small, medium, large)
    #[serde(default = "default_audio_variant")]
    pub default_variant: String,

    /// Groq API base URL for remote transcription
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    /// Remote transcription model
    #[serde(default = "default_remote_audio_model")]
    pub remote_model: String,
}

/// Uploaded-document context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Fragments requested from each searched document
    #[serde(default = "default_max_fragments")]
    pub max_fragments: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.axon")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("~/.axon/staging")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("~/.axon/audio_uploads")
}

fn default_language() -> String {
    "en".to_string()
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_tavily_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_include_domains() -> Vec<String> {
    vec!["edu".to_string(), "org".to_string(), "gov".to_string()]
}

fn default_duckduckgo_base_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_web_search_rpm() -> usize {
    5
}

fn default_premium_search_rpm() -> usize {
    10
}

fn default_translation_rpm() -> usize {
    20
}

fn default_max_steps() -> usize {
    15
}

fn default_translation_base_url() -> String {
    "https://translation.googleapis.com/language/translate/v2".to_string()
}

fn default_audio_variant() -> String {
    "base".to_string()
}

fn default_remote_audio_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_max_fragments() -> usize {
    3
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            temperature: default_temperature(),
            groq_base_url: default_groq_base_url(),
            openai_base_url: default_openai_base_url(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_base_url: default_tavily_base_url(),
            max_results: default_max_results(),
            include_domains: default_include_domains(),
            duckduckgo_base_url: default_duckduckgo_base_url(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            web_search: default_web_search_rpm(),
            premium_search: default_premium_search_rpm(),
            translation: default_translation_rpm(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            memory_enabled: true,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: default_translation_base_url(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_audio_dir(),
            default_variant: default_audio_variant(),
            groq_base_url: default_groq_base_url(),
            remote_model: default_remote_audio_model(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_fragments: default_max_fragments(),
        }
    }
}

impl LLMConfig {
    /// Model name, falling back to the provider's default
    pub fn effective_model(&self) -> &str {
        if !self.model.is_empty() {
            return &self.model;
        }
        match self.provider.as_str() {
            "openai" => "gpt-4-turbo",
            _ => "qwen-qwq-32b",
        }
    }

    /// Base URL for the configured provider
    pub fn base_url(&self) -> &str {
        match self.provider.as_str() {
            "openai" => &self.openai_base_url,
            _ => &self.groq_base_url,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.axon/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, TutorError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, TutorError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TutorError::Configuration(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| TutorError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, TutorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TutorError::Configuration(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ paths
        let mut config = Self::default_config();
        let toml_string = toml::to_string_pretty(&config).map_err(|e| {
            TutorError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        config.validate_and_process()?;

        fs::write(path, toml_string).map_err(|e| {
            TutorError::Configuration(format!("Failed to write config file: {}", e))
        })?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.axon/config.toml)
    pub fn default_config_path() -> Result<PathBuf, TutorError> {
        let home = dirs::home_dir().ok_or_else(|| {
            TutorError::Configuration("Could not determine home directory".to_string())
        })?;

        Ok(home.join(".axon").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
                staging_dir: default_staging_dir(),
                default_language: default_language(),
            },
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            rate_limits: RateLimitConfig::default(),
            agent: AgentConfig::default(),
            translation: TranslationConfig::default(),
            audio: AudioConfig::default(),
            context: ContextConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Validates enumerated fields and limits, expands ~ in paths and creates
    /// the data, staging and audio directories.
    pub fn validate_and_process(&mut self) -> Result<(), TutorError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(TutorError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["groq", "openai"];
        if !valid_providers.contains(&self.llm.provider.as_str()) {
            return Err(TutorError::Configuration(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                valid_providers.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TutorError::Configuration(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        let limits = &self.rate_limits;
        if limits.web_search == 0 || limits.premium_search == 0 || limits.translation == 0 {
            return Err(TutorError::Configuration(
                "rate limits must be positive calls per minute".to_string(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(TutorError::Configuration(
                "agent.max_steps must be at least 1".to_string(),
            ));
        }

        if self.search.max_results == 0 || self.context.max_fragments == 0 {
            return Err(TutorError::Configuration(
                "search.max_results and context.max_fragments must be at least 1".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.core.staging_dir = expand_path(&self.core.staging_dir)?;
        self.audio.upload_dir = expand_path(&self.audio.upload_dir)?;

        for dir in [
            &self.core.data_dir,
            &self.core.staging_dir,
            &self.audio.upload_dir,
        ] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    TutorError::Configuration(format!(
                        "Failed to create directory {:?}: {}",
                        dir, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, TutorError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| TutorError::Configuration("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            TutorError::Configuration("Could not determine home directory".to_string())
        })?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir().ok_or_else(|| {
            TutorError::Configuration("Could not determine home directory".to_string())
        })
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.rate_limits.web_search, 5);
        assert_eq!(config.rate_limits.premium_search, 10);
        assert_eq!(config.rate_limits.translation, 20);
        assert_eq!(config.agent.max_steps, 15);
        assert_eq!(config.search.include_domains, vec!["edu", "org", "gov"]);
    }

    #[test]
    fn test_effective_model_defaults_per_provider() {
        let mut llm = LLMConfig::default();
        assert_eq!(llm.effective_model(), "qwen-qwq-32b");

        llm.provider = "openai".to_string();
        assert_eq!(llm.effective_model(), "gpt-4-turbo");
        assert_eq!(llm.base_url(), "https://api.openai.com/v1");

        llm.model = "gpt-4o-mini".to_string();
        assert_eq!(llm.effective_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[core]
log_level = "debug"

[llm]
provider = "openai"
"#,
        )
        .unwrap();

        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.rate_limits.translation, 20);
        assert_eq!(config.context.max_fragments, 3);
        assert_eq!(config.audio.default_variant, "base");
    }

    #[test]
    fn test_validation_rejects_unknown_provider() {
        let mut config = Config::default_config();
        config.llm.provider = "anthropic".to_string();
        assert!(matches!(
            config.validate_and_process(),
            Err(TutorError::Configuration(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_rate_limit() {
        let mut config = Config::default_config();
        config.rate_limits.translation = 0;
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_validation_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_config();
        config.core.data_dir = dir.path().join("data");
        config.core.staging_dir = dir.path().join("staging");
        config.audio.upload_dir = dir.path().join("audio");

        config.validate_and_process().unwrap();

        assert!(dir.path().join("staging").is_dir());
        assert!(dir.path().join("audio").is_dir());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.provider, deserialized.llm.provider);
    }
}
