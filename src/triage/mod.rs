pub mod engine;
pub mod executor;
pub mod labels;
pub mod session;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use crate::mailbox::MailboxError;

pub use engine::DecisionEngine;
pub use worker::TriageWorker;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("mailbox authentication failed: {0}")]
    Unauthorized(MailboxError),
    #[error("failed to list inbox: {0}")]
    Listing(MailboxError),
    #[error("failed to load mailbox labels: {0}")]
    LabelListing(MailboxError),
}

impl TriageError {
    /// Fatal errors need outside intervention; everything else is retried next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TriageError::Unauthorized(_))
    }

    fn listing(err: MailboxError) -> Self {
        if err.is_auth() {
            TriageError::Unauthorized(err)
        } else {
            TriageError::Listing(err)
        }
    }

    fn label_listing(err: MailboxError) -> Self {
        if err.is_auth() {
            TriageError::Unauthorized(err)
        } else {
            TriageError::LabelListing(err)
        }
    }
}
