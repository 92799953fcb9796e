use std::sync::Arc;

use crate::{
    ai::{
        inference::{build_messages, parse_verdict},
        ClassificationInput, ClassificationOracle,
    },
    config::RoutingConfig,
    domain::{Decision, Message, ParsedSender},
};

pub const CLASSIFIER_UNAVAILABLE: &str = "classifier unavailable";

/// Triage phases, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Blacklist,
    Rules,
    Oracle,
}

pub const PHASE_ORDER: [Phase; 3] = [Phase::Blacklist, Phase::Rules, Phase::Oracle];

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Blacklist => "blacklist",
            Phase::Rules => "rules",
            Phase::Oracle => "oracle",
        }
    }
}

pub struct DecisionEngine {
    oracle: Arc<dyn ClassificationOracle>,
}

impl DecisionEngine {
    pub fn new(oracle: Arc<dyn ClassificationOracle>) -> Self {
        Self { oracle }
    }

    /// Runs the phases in order; the first one that returns a decision wins.
    pub async fn decide(
        &self,
        message: &Message,
        sender: &ParsedSender,
        config: &RoutingConfig,
    ) -> Decision {
        for phase in PHASE_ORDER {
            if let Some(decision) = self.evaluate(phase, message, sender, config).await {
                tracing::debug!(
                    target: "triage",
                    message_id = %message.id,
                    phase = phase.as_str(),
                    "phase decided"
                );
                return decision;
            }
        }
        Decision::skip(CLASSIFIER_UNAVAILABLE)
    }

    async fn evaluate(
        &self,
        phase: Phase,
        message: &Message,
        sender: &ParsedSender,
        config: &RoutingConfig,
    ) -> Option<Decision> {
        match phase {
            Phase::Blacklist => blacklist_phase(sender, config),
            Phase::Rules => rule_phase(sender, config),
            Phase::Oracle => Some(self.oracle_phase(message, sender, config).await),
        }
    }

    async fn oracle_phase(
        &self,
        message: &Message,
        sender: &ParsedSender,
        config: &RoutingConfig,
    ) -> Decision {
        let messages = build_messages(&ClassificationInput {
            address: &sender.address,
            domain: &sender.domain,
            subject: &message.subject,
            snippet: &message.snippet,
            labels: &config.fixed_labels,
        });

        let verdict = match self.oracle.chat(&config.model, &messages).await {
            Ok(content) => parse_verdict(&content),
            Err(err) => Err(err),
        };

        match verdict {
            Ok(verdict) => verdict.into_decision(),
            Err(err) => {
                tracing::warn!(
                    target: "oracle",
                    message_id = %message.id,
                    error = %err,
                    "classification failed; leaving message in inbox"
                );
                Decision::skip(CLASSIFIER_UNAVAILABLE)
            }
        }
    }
}

/// Deletes when the sender domain contains any blacklist entry.
pub fn blacklist_phase(sender: &ParsedSender, config: &RoutingConfig) -> Option<Decision> {
    config
        .blacklist_domains
        .iter()
        .map(|entry| entry.trim().to_lowercase())
        .find(|entry| !entry.is_empty() && sender.domain.contains(entry.as_str()))
        .map(|_| Decision::delete(format!("blacklisted domain {}", sender.domain)))
}

/// Labels by the first configured label whose patterns occur in the address.
///
/// Only labels still listed in `fixed_labels` are consulted, so rules left behind
/// for a removed label never route mail.
pub fn rule_phase(sender: &ParsedSender, config: &RoutingConfig) -> Option<Decision> {
    let address = sender.address.to_lowercase();
    config
        .fixed_labels
        .iter()
        .find(|label| {
            config.rules_for(label).iter().any(|pattern| {
                let pattern = pattern.trim().to_lowercase();
                !pattern.is_empty() && address.contains(&pattern)
            })
        })
        .map(|label| Decision::label(label.clone(), "rule match"))
}
