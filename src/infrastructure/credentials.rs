use std::{fs, io::ErrorKind, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::config::MailboxConfig;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("no mailbox access token: set GMAIL_ACCESS_TOKEN or provide {0}")]
    Missing(String),
    #[error("failed to read token file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("token file {path} has no usable token")]
    Malformed { path: String },
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    token: Option<String>,
    access_token: Option<String>,
}

/// Returns the bearer token for the mailbox API.
///
/// The environment wins over the token file written by the authorization flow.
pub fn load_access_token(config: &MailboxConfig) -> Result<String, CredentialsError> {
    if let Some(token) = &config.access_token {
        return Ok(token.clone());
    }

    let path = Path::new(&config.token_file);
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CredentialsError::Missing(config.token_file.clone()))
        }
        Err(source) => {
            return Err(CredentialsError::Unreadable {
                path: config.token_file.clone(),
                source,
            })
        }
    };

    let malformed = || CredentialsError::Malformed {
        path: config.token_file.clone(),
    };
    let parsed: TokenFile = serde_json::from_str(&raw).map_err(|_| malformed())?;
    parsed
        .token
        .or(parsed.access_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(malformed)
}
