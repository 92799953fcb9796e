use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mailbox: MailboxConfig,
    pub ollama: OllamaConfig,
    pub routing_path: String,
    pub run: RunConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub skip_instance_guard: bool,
}

#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub api_base: Url,
    pub access_token: Option<String>,
    pub token_file: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Continuous,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Once => "once",
            RunMode::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Pause between two cycles that found work.
    pub cooldown: Duration,
    /// Pause after a scan that returned an empty inbox.
    pub idle_wait: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to access routing config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("routing config {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("batch_size must be a positive integer")]
    ZeroBatchSize,
}
