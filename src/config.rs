use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the svodka server.
///
/// Every field has a default taken from the reference deployment, so the
/// server starts without any environment at all.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Model identifier passed to the summarization runtime.
    pub model: String,
    /// Base URL of the summarization runtime.
    pub model_url: String,
    /// Token budget for a single model invocation input.
    pub max_input_tokens: usize,
    /// Default upper bound on generated summary length, in tokens.
    pub max_output_tokens: usize,
    /// Character threshold above which a document is chunked.
    pub max_source_chars: usize,
    /// Cap on the number of rows extracted from an uploaded file.
    pub max_file_items: usize,
    /// Cap on uploaded file size, in megabytes.
    pub max_file_mb: usize,
    /// Enable the dataset-specific cleanup stages (noise drops, phrase rewrites).
    pub dataset_hooks: bool,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_MODEL: &str = "IlyaGusev/rut5_base_sum_gazeta";
const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:8500";
const DEFAULT_MAX_INPUT_TOKENS: usize = 512;
const DEFAULT_MAX_OUTPUT_TOKENS: usize = 160;
const DEFAULT_MAX_SOURCE_CHARS: usize = 1500;
const DEFAULT_MAX_FILE_ITEMS: usize = 2000;
const DEFAULT_MAX_FILE_MB: usize = 10;

impl Config {
    /// Load configuration from environment variables, applying defaults and caps.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_url: load_env_optional("SUMMARIZATION_MODEL_URL")
                .unwrap_or_else(|| DEFAULT_MODEL_URL.to_string()),
            max_input_tokens: load_env_usize(
                "SUMMARIZATION_MAX_INPUT_TOKENS",
                DEFAULT_MAX_INPUT_TOKENS,
            )?,
            max_output_tokens: load_env_usize(
                "SUMMARIZATION_MAX_OUTPUT_TOKENS",
                DEFAULT_MAX_OUTPUT_TOKENS,
            )?,
            max_source_chars: load_env_usize(
                "SUMMARIZATION_MAX_SOURCE_CHARS",
                DEFAULT_MAX_SOURCE_CHARS,
            )?,
            max_file_items: load_env_usize("SUMMARIZATION_MAX_FILE_ITEMS", DEFAULT_MAX_FILE_ITEMS)?
                .clamp(1, 20_000),
            max_file_mb: load_env_usize("SUMMARIZATION_MAX_FILE_MB", DEFAULT_MAX_FILE_MB)?
                .clamp(1, 100),
            dataset_hooks: load_env_optional("SUMMARIZATION_DATASET_HOOKS")
                .map(|value| {
                    parse_bool(&value)
                        .ok_or_else(|| ConfigError::InvalidValue("SUMMARIZATION_DATASET_HOOKS".into()))
                })
                .transpose()?
                .unwrap_or(true),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_usize(key: &str, default: usize) -> Result<usize, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        model = %config.model,
        model_url = %config.model_url,
        max_source_chars = config.max_source_chars,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
