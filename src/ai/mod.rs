pub mod client;
pub mod inference;

use async_trait::async_trait;
use thiserror::Error;

pub use client::OllamaClient;
pub use inference::{ChatMessage, ClassificationInput};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle returned an empty message")]
    EmptyResponse,
    #[error("oracle output is not a JSON object: {0}")]
    Unparseable(String),
    #[error("oracle output has no category")]
    MissingCategory,
}

/// Chat-style text completion service used as the last triage phase.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, OracleError>;
}
