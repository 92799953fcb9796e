use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use super::env::ConfigError;

/// Mailbox state markers that always exist and are never created.
pub const SYSTEM_LABELS: [&str; 6] = ["INBOX", "SPAM", "TRASH", "UNREAD", "STARRED", "IMPORTANT"];

/// Routing rules consumed by the triage engine.
///
/// Stored as JSON next to the binary. Missing keys fall back to the defaults below,
/// the legacy `family_emails` list is folded into the `Family` rules, and rule entries
/// are kept in sync with `fixed_labels`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_blacklist")]
    pub blacklist_domains: Vec<String>,
    #[serde(default = "default_labels")]
    pub fixed_labels: Vec<String>,
    #[serde(default)]
    pub label_rules: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing)]
    family_emails: Option<Vec<String>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let label_rules = ["Family", "Work", "Finance"]
            .into_iter()
            .map(|label| (label.to_string(), Vec::new()))
            .collect();
        Self {
            model: default_model(),
            batch_size: default_batch_size(),
            blacklist_domains: default_blacklist(),
            fixed_labels: default_labels(),
            label_rules,
            family_emails: None,
        }
    }
}

impl RoutingConfig {
    /// Reads the routing file, writing the defaults first when it does not exist yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let mut config = Self::default();
            config.normalize();
            config.save(path)?;
            tracing::info!(target: "config", path = %path.display(), "wrote default routing config");
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Json { source, .. } => ConfigError::Json {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut config: RoutingConfig =
            serde_json::from_str(raw).map_err(|source| ConfigError::Json {
                path: String::new(),
                source,
            })?;
        config.migrate();
        config.normalize();
        if config.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let payload = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, payload).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rule patterns for a configured label, in declared order.
    pub fn rules_for(&self, label: &str) -> &[String] {
        self.label_rules
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn migrate(&mut self) {
        if let Some(family) = self.family_emails.take() {
            if !family.is_empty() {
                self.label_rules
                    .entry("Family".to_string())
                    .or_default()
                    .extend(family);
            }
        }
    }

    fn normalize(&mut self) {
        self.model = self.model.trim().to_string();
        self.blacklist_domains = clean_list(std::mem::take(&mut self.blacklist_domains))
            .into_iter()
            .map(|entry| entry.to_lowercase())
            .collect();

        let mut labels: Vec<String> = Vec::new();
        for label in clean_list(std::mem::take(&mut self.fixed_labels)) {
            if !labels.iter().any(|known| known.eq_ignore_ascii_case(&label)) {
                labels.push(label);
            }
        }

        let mut rules: BTreeMap<String, Vec<String>> = labels
            .iter()
            .map(|label| (label.clone(), Vec::new()))
            .collect();
        for (key, patterns) in std::mem::take(&mut self.label_rules) {
            let owner = labels
                .iter()
                .find(|label| label.trim().eq_ignore_ascii_case(key.trim()));
            match owner {
                Some(label) => {
                    let slot = rules.entry(label.clone()).or_default();
                    for pattern in clean_list(patterns) {
                        if !slot.contains(&pattern) {
                            slot.push(pattern);
                        }
                    }
                }
                None => {
                    tracing::warn!(target: "config", label = %key, "pruned rules for unlisted label");
                }
            }
        }

        self.fixed_labels = labels;
        self.label_rules = rules;
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

fn default_batch_size() -> u32 {
    20
}

fn default_blacklist() -> Vec<String> {
    vec!["quora.com".into(), "reddit.com".into(), "temu.com".into()]
}

fn default_labels() -> Vec<String> {
    ["Finance", "Work", "Personal", "Receipts", "Family"]
        .into_iter()
        .map(String::from)
        .collect()
}
