use std::sync::Arc;

use crate::{
    config::RoutingConfig,
    domain::{parse_sender, BatchPlan, CycleSummary, Decision, Message, ParsedSender},
    infrastructure::shutdown::StopSignal,
    mailbox::MailboxProvider,
};

use super::{
    engine::DecisionEngine,
    executor::{self, ExecutionReport},
    labels::LabelCache,
    TriageError,
};

pub const INBOX_QUERY: &str = "label:INBOX";

/// Result of the scan half of a cycle.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub plan: BatchPlan,
    pub summary: CycleSummary,
}

/// One mailbox session: the provider, the routing rules and the label cache
/// built from the provider's listing when the session opens.
pub struct TriageSession {
    provider: Arc<dyn MailboxProvider>,
    engine: Arc<DecisionEngine>,
    config: Arc<RoutingConfig>,
    labels: LabelCache,
}

impl TriageSession {
    pub async fn open(
        provider: Arc<dyn MailboxProvider>,
        engine: Arc<DecisionEngine>,
        config: Arc<RoutingConfig>,
    ) -> Result<Self, TriageError> {
        let listing = provider
            .list_labels()
            .await
            .map_err(TriageError::label_listing)?;
        let labels = LabelCache::from_labels(listing);
        tracing::info!(target: "triage", labels = labels.len(), "mailbox session opened");
        Ok(Self {
            provider,
            engine,
            config,
            labels,
        })
    }

    /// Lists the inbox and classifies each message into a batch plan.
    ///
    /// A stop request ends the scan between messages; whatever was planned so
    /// far is still returned for execution.
    pub async fn scan(&mut self, stop: &StopSignal) -> Result<ScanOutcome, TriageError> {
        tracing::info!(
            target: "triage",
            batch_size = self.config.batch_size,
            "scanning inbox"
        );
        let refs = self
            .provider
            .list_messages(INBOX_QUERY, self.config.batch_size)
            .await
            .map_err(TriageError::listing)?;

        let mut outcome = ScanOutcome::default();
        if refs.is_empty() {
            tracing::info!(target: "triage", "inbox zero");
            return Ok(outcome);
        }

        for message_ref in refs {
            if stop.is_stopped() {
                tracing::info!(target: "triage", "stop requested; ending scan early");
                break;
            }
            outcome.summary.scanned += 1;
            self.triage_message(&message_ref.id, &mut outcome).await?;
        }

        Ok(outcome)
    }

    /// Applies a scanned plan and folds the batch results into the summary.
    pub async fn execute(&self, outcome: ScanOutcome) -> CycleSummary {
        let ScanOutcome { plan, mut summary } = outcome;
        let ExecutionReport {
            trashed,
            moved,
            failed_batches,
        } = executor::execute(self.provider.as_ref(), &plan).await;
        summary.trashed = trashed;
        summary.moved = moved;
        summary.failed_batches = failed_batches;

        tracing::info!(
            target: "triage",
            scanned = summary.scanned,
            trashed = summary.trashed,
            moved = summary.moved,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            failed = summary.failed,
            failed_batches = summary.failed_batches,
            "cycle complete"
        );
        summary
    }

    async fn triage_message(
        &mut self,
        id: &str,
        outcome: &mut ScanOutcome,
    ) -> Result<(), TriageError> {
        let metadata = match self.provider.get_message_metadata(id).await {
            Ok(metadata) => metadata,
            Err(err) if err.is_auth() => return Err(TriageError::Unauthorized(err)),
            Err(err) => {
                outcome.summary.failed += 1;
                tracing::warn!(
                    target: "triage",
                    message_id = %id,
                    error = %err,
                    "failed to fetch message; skipping this cycle"
                );
                return Ok(());
            }
        };

        let message = Message::from_metadata(id, metadata);
        let sender = parse_sender(&message.sender);
        let decision = self.engine.decide(&message, &sender, &self.config).await;
        log_decision(&message, &sender, &decision);

        match decision {
            Decision::Delete { .. } => outcome.plan.add_trash(message.id),
            Decision::Label { name, .. } => {
                match self.labels.resolve(self.provider.as_ref(), &name).await {
                    Ok(label_id) => {
                        if !outcome.plan.add_move(&label_id, message.id) {
                            outcome.summary.skipped += 1;
                        }
                    }
                    Err(err) => match err.into_auth_error() {
                        Ok(source) => return Err(TriageError::Unauthorized(source)),
                        Err(err) => {
                            outcome.summary.unresolved += 1;
                            tracing::warn!(
                                target: "triage",
                                message_id = %message.id,
                                label = %name,
                                error = %err,
                                "label unresolved; skipping this cycle"
                            );
                        }
                    },
                }
            }
            Decision::Skip { .. } => outcome.summary.skipped += 1,
        }
        Ok(())
    }
}

fn log_decision(message: &Message, sender: &ParsedSender, decision: &Decision) {
    let subject: String = message.subject.chars().take(40).collect();
    tracing::info!(
        target: "triage",
        message_id = %message.id,
        domain = %sender.domain,
        action = decision.action(),
        label = decision.label_name().unwrap_or("-"),
        reason = decision.reason(),
        subject = %subject,
        "message triaged"
    );
}
