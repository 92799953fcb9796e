use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::MailboxConfig,
    domain::{Header, MessageMetadata, MessageRef},
};

use super::{BatchModify, LabelInfo, MailboxError, MailboxProvider};

/// Gmail REST v1 client bound to a single user's mailbox.
#[derive(Clone)]
pub struct GmailClient {
    http: Client,
    base: String,
    access_token: String,
    timeout: Duration,
}

impl GmailClient {
    pub fn new(http: Client, config: &MailboxConfig, access_token: String) -> Self {
        Self {
            http,
            base: config.api_base.as_str().trim_end_matches('/').to_string(),
            access_token,
            timeout: config.timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, MailboxError> {
        let response = request
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await?;
        check_status(response, what).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, MailboxError> {
        let response = self.send(request, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| MailboxError::Decode(format!("{what}: {err}")))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, MailboxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            MailboxError::Unauthorized(status.as_u16())
        }
        StatusCode::CONFLICT => MailboxError::Conflict(what.to_string()),
        StatusCode::NOT_FOUND => MailboxError::NotFound(what.to_string()),
        _ => MailboxError::Api {
            status: status.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl MailboxProvider for GmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError> {
        let listing: LabelList = self
            .send_json(self.http.get(self.url("labels")), "labels")
            .await?;
        Ok(listing.labels)
    }

    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        let request = self
            .http
            .get(self.url("messages"))
            .query(&[("q", query.to_string()), ("maxResults", max_results.to_string())]);
        let listing: MessageList = self.send_json(request, "messages").await?;
        Ok(listing.messages)
    }

    async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata, MailboxError> {
        let request = self.http.get(self.url(&format!("messages/{id}"))).query(&[
            ("format", "metadata"),
            ("metadataHeaders", "Subject"),
            ("metadataHeaders", "From"),
        ]);
        let message: GmailMessage = self.send_json(request, &format!("message {id}")).await?;
        Ok(MessageMetadata {
            headers: message.payload.map(|p| p.headers).unwrap_or_default(),
            snippet: message.snippet,
        })
    }

    async fn create_label(&self, name: &str) -> Result<LabelInfo, MailboxError> {
        let body = CreateLabel {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };
        let request = self.http.post(self.url("labels")).json(&body);
        self.send_json(request, &format!("label {name}")).await
    }

    async fn batch_modify(&self, request: &BatchModify) -> Result<(), MailboxError> {
        let builder = self
            .http
            .post(self.url("messages/batchModify"))
            .json(request);
        self.send(builder, "messages/batchModify").await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LabelList {
    #[serde(default)]
    labels: Vec<LabelInfo>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    #[serde(default)]
    snippet: String,
    payload: Option<GmailPayload>,
}

#[derive(Debug, Deserialize)]
struct GmailPayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLabel<'a> {
    name: &'a str,
    label_list_visibility: &'static str,
    message_list_visibility: &'static str,
}
