pub mod gmail;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MessageMetadata, MessageRef};

pub use gmail::GmailClient;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("mailbox rejected the credentials (status {0})")]
    Unauthorized(u16),
    #[error("resource already exists: {0}")]
    Conflict(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("mailbox API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("mailbox request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected mailbox payload: {0}")]
    Decode(String),
}

impl MailboxError {
    pub fn is_auth(&self) -> bool {
        matches!(self, MailboxError::Unauthorized(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// Body of a bulk label mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchModify {
    pub ids: Vec<String>,
    pub add_label_ids: Vec<String>,
    pub remove_label_ids: Vec<String>,
}

/// Remote mailbox operations the triage worker depends on.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError>;

    async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, MailboxError>;

    async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata, MailboxError>;

    /// Fails with [`MailboxError::Conflict`] when the name is already taken.
    async fn create_label(&self, name: &str) -> Result<LabelInfo, MailboxError>;

    async fn batch_modify(&self, request: &BatchModify) -> Result<(), MailboxError>;
}
