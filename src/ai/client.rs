use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OllamaConfig;

use super::{inference::ChatMessage, ClassificationOracle, OracleError};

/// Non-streaming client for Ollama's `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(http: Client, config: &OllamaConfig) -> Result<Self, url::ParseError> {
        let base = config.base_url.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/api/chat"))?;
        Ok(Self {
            http,
            endpoint,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl ClassificationOracle for OllamaClient {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, OracleError> {
        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
            format: "json",
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let completion: OllamaChatResponse = response.json().await?;
        let content = completion
            .message
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;

        tracing::debug!(target: "oracle", model, chars = content.len(), "oracle replied");
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: Option<String>,
}
