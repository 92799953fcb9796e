//! In-memory mailbox used by the triage tests.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    ai::{ChatMessage, ClassificationOracle, OracleError},
    domain::{Header, MessageMetadata, MessageRef},
    mailbox::{BatchModify, LabelInfo, MailboxError, MailboxProvider},
};

#[derive(Default)]
struct State {
    labels: Vec<LabelInfo>,
    inbox: Vec<(String, MessageMetadata)>,
    created: Vec<String>,
    create_calls: usize,
    list_calls: usize,
    batches: Vec<BatchModify>,
    fail_creates: bool,
    failing_targets: HashSet<String>,
    failing_metadata: HashSet<String>,
    unauthorized_listing: bool,
    transient_listing_failures: usize,
}

#[derive(Default)]
pub struct FakeMailbox {
    state: Mutex<State>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(self, id: &str, name: &str) -> Self {
        self.insert_label_behind_cache(id, name);
        self
    }

    pub fn with_message(self, id: &str, from: &str, subject: &str) -> Self {
        let metadata = MessageMetadata {
            headers: vec![
                Header {
                    name: "From".into(),
                    value: from.into(),
                },
                Header {
                    name: "Subject".into(),
                    value: subject.into(),
                },
            ],
            snippet: format!("snippet of {id}"),
        };
        self.state.lock().inbox.push((id.to_string(), metadata));
        self
    }

    pub fn failing_creates(self) -> Self {
        self.state.lock().fail_creates = true;
        self
    }

    pub fn failing_batch_for(self, label_id: &str) -> Self {
        self.state.lock().failing_targets.insert(label_id.to_string());
        self
    }

    pub fn failing_metadata(self, message_id: &str) -> Self {
        self.state.lock().failing_metadata.insert(message_id.to_string());
        self
    }

    pub fn unauthorized_listing(self) -> Self {
        self.state.lock().unauthorized_listing = true;
        self
    }

    pub fn transient_listing_failures(self, count: usize) -> Self {
        self.state.lock().transient_listing_failures = count;
        self
    }

    pub fn insert_label_behind_cache(&self, id: &str, name: &str) {
        self.state.lock().labels.push(LabelInfo {
            id: id.into(),
            name: name.into(),
        });
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    pub fn created_names(&self) -> Vec<String> {
        self.state.lock().created.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn batches(&self) -> Vec<BatchModify> {
        self.state.lock().batches.clone()
    }

    pub fn inbox_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .inbox
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn unavailable() -> MailboxError {
    MailboxError::Api {
        status: 503,
        body: "backend unavailable".into(),
    }
}

#[async_trait]
impl MailboxProvider for FakeMailbox {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError> {
        Ok(self.state.lock().labels.clone())
    }

    async fn list_messages(
        &self,
        _query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.unauthorized_listing {
            return Err(MailboxError::Unauthorized(401));
        }
        if state.transient_listing_failures > 0 {
            state.transient_listing_failures -= 1;
            return Err(unavailable());
        }
        Ok(state
            .inbox
            .iter()
            .take(max_results as usize)
            .map(|(id, _)| MessageRef { id: id.clone() })
            .collect())
    }

    async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata, MailboxError> {
        let state = self.state.lock();
        if state.failing_metadata.contains(id) {
            return Err(unavailable());
        }
        state
            .inbox
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| MailboxError::NotFound(id.to_string()))
    }

    async fn create_label(&self, name: &str) -> Result<LabelInfo, MailboxError> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        if state.fail_creates {
            return Err(unavailable());
        }
        if state
            .labels
            .iter()
            .any(|label| label.name.eq_ignore_ascii_case(name))
        {
            return Err(MailboxError::Conflict(name.to_string()));
        }
        let label = LabelInfo {
            id: format!("Label_{}", state.labels.len() + 1),
            name: name.to_string(),
        };
        state.labels.push(label.clone());
        state.created.push(name.to_string());
        Ok(label)
    }

    async fn batch_modify(&self, request: &BatchModify) -> Result<(), MailboxError> {
        let mut state = self.state.lock();
        state.batches.push(request.clone());
        if request
            .add_label_ids
            .iter()
            .any(|id| state.failing_targets.contains(id))
        {
            return Err(unavailable());
        }
        if request.remove_label_ids.iter().any(|id| id == "INBOX") {
            state.inbox.retain(|(id, _)| !request.ids.contains(id));
        }
        Ok(())
    }
}

/// Oracle answering by the first needle found in the user prompt.
pub struct ScriptedOracle {
    replies: Vec<(String, Option<String>)>,
    fallback: Option<String>,
    calls: Mutex<usize>,
}

impl ScriptedOracle {
    pub fn replying(text: &str) -> Self {
        Self {
            replies: Vec::new(),
            fallback: Some(text.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Vec::new(),
            fallback: None,
            calls: Mutex::new(0),
        }
    }

    pub fn when(mut self, needle: &str, reply: &str) -> Self {
        self.replies.push((needle.to_string(), Some(reply.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str) -> Self {
        self.replies.push((needle.to_string(), None));
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ClassificationOracle for ScriptedOracle {
    async fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, OracleError> {
        *self.calls.lock() += 1;
        let prompt = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());
        reply.ok_or(OracleError::EmptyResponse)
    }
}
