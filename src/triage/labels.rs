use std::collections::HashMap;

use thiserror::Error;

use crate::{
    config::SYSTEM_LABELS,
    mailbox::{LabelInfo, MailboxError, MailboxProvider},
};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label name is empty")]
    EmptyName,
    #[error("failed to create label {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: MailboxError,
    },
    #[error("failed to refresh labels after conflict on {name}: {source}")]
    Refresh {
        name: String,
        #[source]
        source: MailboxError,
    },
    #[error("label {0} reported as existing but missing from listing")]
    StillMissing(String),
}

impl LabelError {
    /// Splits out provider authentication failures, which end the cycle.
    pub fn into_auth_error(self) -> Result<MailboxError, LabelError> {
        match self {
            LabelError::Create { source, .. } | LabelError::Refresh { source, .. }
                if source.is_auth() =>
            {
                Ok(source)
            }
            other => Err(other),
        }
    }
}

/// Lowercased label name to provider id, owned by one mailbox session.
///
/// Entries are only ever added; a refresh merges the provider listing in.
#[derive(Debug, Default)]
pub struct LabelCache {
    ids: HashMap<String, String>,
}

impl LabelCache {
    pub fn from_labels(labels: Vec<LabelInfo>) -> Self {
        let mut cache = Self::default();
        cache.merge(labels);
        cache
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    fn merge(&mut self, labels: Vec<LabelInfo>) {
        for label in labels {
            self.ids.insert(label.name.trim().to_lowercase(), label.id);
        }
    }

    /// Maps a label name to its provider id, creating the label when unknown.
    ///
    /// Creation is attempted once per name; a conflict answer re-reads the
    /// provider listing instead of retrying.
    pub async fn resolve(
        &mut self,
        provider: &dyn MailboxProvider,
        name: &str,
    ) -> Result<String, LabelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LabelError::EmptyName);
        }

        let upper = name.to_uppercase();
        if SYSTEM_LABELS.contains(&upper.as_str()) {
            return Ok(upper);
        }

        if let Some(id) = self.get(name) {
            return Ok(id.to_string());
        }
        let key = name.to_lowercase();

        tracing::info!(target: "labels", label = %name, "creating label");
        match provider.create_label(name).await {
            Ok(created) => {
                self.ids.insert(key, created.id.clone());
                Ok(created.id)
            }
            Err(MailboxError::Conflict(_)) => {
                tracing::info!(
                    target: "labels",
                    label = %name,
                    "label already exists; refreshing cache"
                );
                let labels = provider
                    .list_labels()
                    .await
                    .map_err(|source| LabelError::Refresh {
                        name: name.to_string(),
                        source,
                    })?;
                self.merge(labels);
                self.ids
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| LabelError::StillMissing(name.to_string()))
            }
            Err(source) => Err(LabelError::Create {
                name: name.to_string(),
                source,
            }),
        }
    }
}
