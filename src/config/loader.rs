use std::{env, str::FromStr, time::Duration};

use url::Url;

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, LoggingConfig, MailboxConfig, OllamaConfig,
    RunConfig, RunMode,
};

const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mailbox = MailboxConfig {
            api_base: parse_url(
                "GMAIL_API_BASE",
                env::var("GMAIL_API_BASE").unwrap_or_else(|_| DEFAULT_GMAIL_API_BASE.to_string()),
            )?,
            access_token: env::var("GMAIL_ACCESS_TOKEN").ok().filter(|v| !v.is_empty()),
            token_file: env::var("GMAIL_TOKEN_FILE").unwrap_or_else(|_| "token.json".to_string()),
            timeout: Duration::from_millis(parse_or("MAILBOX_TIMEOUT_MS", 30_000)?),
        };

        let ollama = OllamaConfig {
            base_url: parse_url(
                "OLLAMA_BASE_URL",
                env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string()),
            )?,
            timeout: Duration::from_millis(parse_or("OLLAMA_TIMEOUT_MS", 120_000)?),
        };

        let mode = match env::var("RUN_MODE") {
            Ok(value) => parse_mode(&value)?,
            Err(_) => RunMode::Continuous,
        };
        let run = RunConfig {
            mode,
            cooldown: Duration::from_secs(parse_or("CYCLE_COOLDOWN_SECS", 5)?),
            idle_wait: Duration::from_secs(parse_or("IDLE_WAIT_SECS", 60)?),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            mailbox,
            ollama,
            routing_path: env::var("ROUTING_CONFIG").unwrap_or_else(|_| "config.json".to_string()),
            run,
            directories,
            logging,
            skip_instance_guard: env::var("SKIP_INSTANCE_GUARD").map_or(false, |v| v == "1"),
        })
    }
}

fn parse_mode(value: &str) -> Result<RunMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "once" | "single" => Ok(RunMode::Once),
        "continuous" | "loop" => Ok(RunMode::Continuous),
        _ => Err(ConfigError::Invalid {
            key: "RUN_MODE",
            value: value.to_string(),
        }),
    }
}

fn parse_url(key: &'static str, raw: String) -> Result<Url, ConfigError> {
    match Url::parse(raw.trim_end_matches('/')) {
        Ok(url) => Ok(url),
        Err(_) => Err(ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
