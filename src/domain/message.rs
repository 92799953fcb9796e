use serde::Deserialize;

const NO_SUBJECT: &str = "(No Subject)";
const UNKNOWN_SENDER: &str = "(Unknown)";

/// Identifier returned by an inbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageMetadata {
    pub headers: Vec<Header>,
    pub snippet: String,
}

impl MessageMetadata {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// A mailbox entry under consideration for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: String,
}

impl Message {
    pub fn from_metadata(id: impl Into<String>, metadata: MessageMetadata) -> Self {
        let subject = metadata.header("Subject").unwrap_or(NO_SUBJECT).to_string();
        let sender = metadata.header("From").unwrap_or(UNKNOWN_SENDER).to_string();
        Self {
            id: id.into(),
            subject,
            sender,
            snippet: metadata.snippet,
        }
    }
}
