use std::collections::{BTreeMap, BTreeSet};

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Delete { reason: String },
    Label { name: String, reason: String },
    Skip { reason: String },
}

impl Decision {
    pub fn delete(reason: impl Into<String>) -> Self {
        Decision::Delete {
            reason: reason.into(),
        }
    }

    pub fn label(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Decision::Label {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Decision::Skip {
            reason: reason.into(),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Decision::Delete { .. } => "delete",
            Decision::Label { .. } => "label",
            Decision::Skip { .. } => "skip",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Delete { reason }
            | Decision::Label { reason, .. }
            | Decision::Skip { reason } => reason,
        }
    }

    pub fn label_name(&self) -> Option<&str> {
        match self {
            Decision::Label { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Per-cycle grouping of message ids by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    trash: BTreeSet<String>,
    moves: BTreeMap<String, BTreeSet<String>>,
}

impl BatchPlan {
    pub fn add_trash(&mut self, message_id: impl Into<String>) {
        self.trash.insert(message_id.into());
    }

    /// Queues a move into `label_id`. Returns `false` for the inbox marker,
    /// which is never a move target.
    pub fn add_move(&mut self, label_id: &str, message_id: impl Into<String>) -> bool {
        if label_id.eq_ignore_ascii_case("INBOX") {
            return false;
        }
        self.moves
            .entry(label_id.to_string())
            .or_default()
            .insert(message_id.into());
        true
    }

    pub fn trash(&self) -> &BTreeSet<String> {
        &self.trash
    }

    pub fn moves(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.trash.is_empty() && self.moves.values().all(BTreeSet::is_empty)
    }
}

/// Counters reported at the end of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub scanned: usize,
    pub trashed: usize,
    pub moved: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub failed_batches: usize,
}
