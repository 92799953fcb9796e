use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::{RoutingConfig, RunConfig, RunMode},
    domain::CycleSummary,
    infrastructure::shutdown::StopSignal,
    mailbox::MailboxProvider,
};

use super::{engine::DecisionEngine, session::TriageSession, TriageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Scanning,
    Executing,
    Cooldown,
}

/// Drives triage cycles against one mailbox, either once or until stopped.
pub struct TriageWorker {
    provider: Arc<dyn MailboxProvider>,
    engine: Arc<DecisionEngine>,
    config: Arc<RoutingConfig>,
    run: RunConfig,
    state: watch::Sender<LoopState>,
}

impl TriageWorker {
    pub fn new(
        provider: Arc<dyn MailboxProvider>,
        engine: Arc<DecisionEngine>,
        config: Arc<RoutingConfig>,
        run: RunConfig,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            provider,
            engine,
            config,
            run,
            state,
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn spawn(self: Arc<Self>, mut stop: StopSignal) -> JoinHandle<Result<(), TriageError>> {
        tokio::spawn(async move {
            let result = match self.run.mode {
                RunMode::Once => self.run_once(&stop).await.map(|_| ()),
                RunMode::Continuous => self.run_until_cancelled(&mut stop).await,
            };
            if let Err(err) = &result {
                tracing::error!(target: "triage", error = %err, "triage worker stopped");
            }
            result
        })
    }

    /// Opens a session and runs a single scan and execute pass.
    pub async fn run_once(&self, stop: &StopSignal) -> Result<CycleSummary, TriageError> {
        let result = match self.open_session().await {
            Ok(mut session) => self.cycle(&mut session, stop).await,
            Err(err) => Err(err),
        };
        self.set_state(LoopState::Idle);
        result
    }

    /// Repeats [`Self::run_once`]'s pass until the stop signal fires.
    ///
    /// Transient failures wait out a cooldown and try again; authentication
    /// failures end the loop and are returned.
    pub async fn run_until_cancelled(&self, stop: &mut StopSignal) -> Result<(), TriageError> {
        let mut session: Option<TriageSession> = None;
        let result = loop {
            if stop.is_stopped() {
                break Ok(());
            }

            if session.is_none() {
                match self.open_session().await {
                    Ok(opened) => session = Some(opened),
                    Err(err) if err.is_fatal() => break Err(err),
                    Err(err) => {
                        tracing::warn!(target: "triage", error = %err, "session setup failed; retrying");
                        self.set_state(LoopState::Cooldown);
                        if !stop.pause(self.run.cooldown).await {
                            break Ok(());
                        }
                        continue;
                    }
                }
            }
            let Some(active) = session.as_mut() else {
                continue;
            };

            let wait = match self.cycle(active, stop).await {
                Ok(summary) if summary.scanned == 0 => self.run.idle_wait,
                Ok(_) => self.run.cooldown,
                Err(err) if err.is_fatal() => break Err(err),
                Err(err) => {
                    tracing::warn!(target: "triage", error = %err, "cycle failed; retrying after cooldown");
                    self.run.cooldown
                }
            };

            self.set_state(LoopState::Cooldown);
            if !stop.pause(wait).await {
                break Ok(());
            }
        };

        self.set_state(LoopState::Idle);
        tracing::info!(target: "triage", "triage loop stopped");
        result
    }

    async fn open_session(&self) -> Result<TriageSession, TriageError> {
        TriageSession::open(
            self.provider.clone(),
            self.engine.clone(),
            self.config.clone(),
        )
        .await
    }

    async fn cycle(
        &self,
        session: &mut TriageSession,
        stop: &StopSignal,
    ) -> Result<CycleSummary, TriageError> {
        self.set_state(LoopState::Scanning);
        let outcome = session.scan(stop).await?;
        self.set_state(LoopState::Executing);
        Ok(session.execute(outcome).await)
    }

    fn set_state(&self, state: LoopState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        infrastructure::shutdown::StopHandle,
        triage::testing::{FakeMailbox, ScriptedOracle},
    };

    fn routing() -> Arc<RoutingConfig> {
        Arc::new(
            RoutingConfig::from_json(
                r#"{
                    "blacklist_domains": ["quora.com"],
                    "fixed_labels": ["Finance", "Work"],
                    "label_rules": {"Finance": ["chase.com"]}
                }"#,
            )
            .unwrap(),
        )
    }

    fn run_config(mode: RunMode) -> RunConfig {
        RunConfig {
            mode,
            cooldown: Duration::from_millis(5),
            idle_wait: Duration::from_millis(20),
        }
    }

    fn worker(
        mailbox: &Arc<FakeMailbox>,
        oracle: ScriptedOracle,
        mode: RunMode,
    ) -> Arc<TriageWorker> {
        let provider: Arc<dyn MailboxProvider> = mailbox.clone();
        Arc::new(TriageWorker::new(
            provider,
            Arc::new(DecisionEngine::new(Arc::new(oracle))),
            routing(),
            run_config(mode),
        ))
    }

    fn inbox() -> Arc<FakeMailbox> {
        Arc::new(
            FakeMailbox::new()
                .with_label("Label_1", "Finance")
                .with_message("q1", "Quora <digest@notifications.quora.com>", "Top answers")
                .with_message("c1", "Chase <billing@chase.com>", "Statement")
                .with_message("c2", "alerts@chase.com", "Payment due")
                .with_message("s1", "Steam <store@steampowered.com>", "Summer sale")
                .with_message("p1", "friend@example.org", "Lunch?")
                .with_message("x1", "deals@shop.io", "50% off"),
        )
    }

    fn oracle() -> ScriptedOracle {
        ScriptedOracle::replying(r#"{"category":"INBOX","reasoning":"personal"}"#)
            .when("steampowered.com", r#"  Sure! {"category":"Gaming","reasoning":"steam sale"}  "#)
            .fail_when("shop.io")
    }

    #[tokio::test]
    async fn single_pass_groups_mutations_by_destination() {
        let mailbox = inbox();
        let worker = worker(&mailbox, oracle(), RunMode::Once);
        let (_handle, stop) = StopHandle::new();

        let summary = worker.run_once(&stop).await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                scanned: 6,
                trashed: 1,
                moved: 3,
                skipped: 2,
                unresolved: 0,
                failed: 0,
                failed_batches: 0,
            }
        );

        let batches = mailbox.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].ids, vec!["q1"]);
        assert_eq!(batches[0].add_label_ids, vec!["TRASH"]);
        let finance = batches
            .iter()
            .find(|batch| batch.add_label_ids == vec!["Label_1".to_string()])
            .unwrap();
        assert_eq!(finance.ids, vec!["c1", "c2"]);
        assert_eq!(mailbox.created_names(), vec!["Gaming".to_string()]);

        // oracle failure and inbox verdict stay put
        assert_eq!(mailbox.inbox_ids(), vec!["p1", "x1"]);
        assert_eq!(*worker.subscribe_state().borrow(), LoopState::Idle);
    }

    #[tokio::test]
    async fn a_failed_fetch_only_skips_that_message() {
        let mailbox = Arc::new(
            FakeMailbox::new()
                .with_message("c1", "billing@chase.com", "Statement")
                .with_message("bad", "billing@chase.com", "Statement")
                .failing_metadata("bad"),
        );
        let worker = worker(&mailbox, oracle(), RunMode::Once);
        let (_handle, stop) = StopHandle::new();

        let summary = worker.run_once(&stop).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.moved, 1);
        assert_eq!(mailbox.inbox_ids(), vec!["bad"]);
    }

    #[tokio::test]
    async fn unresolved_labels_leave_messages_for_the_next_cycle() {
        let mailbox = Arc::new(
            FakeMailbox::new()
                .with_message("s1", "store@steampowered.com", "Sale")
                .failing_creates(),
        );
        let worker = worker(&mailbox, oracle(), RunMode::Once);
        let (_handle, stop) = StopHandle::new();

        let summary = worker.run_once(&stop).await.unwrap();
        assert_eq!(summary.unresolved, 1);
        assert!(mailbox.batches().is_empty());
        assert_eq!(mailbox.inbox_ids(), vec!["s1"]);
    }

    #[tokio::test]
    async fn a_stop_before_the_scan_plans_nothing() {
        let mailbox = inbox();
        let worker = worker(&mailbox, oracle(), RunMode::Once);
        let (handle, stop) = StopHandle::new();
        handle.request_stop();

        let summary = worker.run_once(&stop).await.unwrap();
        assert_eq!(summary.scanned, 0);
        assert!(mailbox.batches().is_empty());
    }

    #[tokio::test]
    async fn continuous_mode_survives_transient_errors_until_stopped() {
        let mailbox = Arc::new(
            FakeMailbox::new()
                .with_message("c1", "billing@chase.com", "Statement")
                .transient_listing_failures(2),
        );
        let worker = worker(&mailbox, oracle(), RunMode::Continuous);
        let (handle, stop) = StopHandle::new();
        let task = worker.clone().spawn(stop);

        timeout(Duration::from_secs(5), async {
            while !mailbox.inbox_ids().is_empty() || mailbox.list_calls() < 4 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        handle.request_stop();
        let result = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert_eq!(mailbox.batches().len(), 1);
        assert_eq!(*worker.subscribe_state().borrow(), LoopState::Idle);
    }

    #[tokio::test]
    async fn authentication_failure_stops_the_loop() {
        let mailbox = Arc::new(FakeMailbox::new().unauthorized_listing());
        let worker = worker(&mailbox, oracle(), RunMode::Continuous);
        let (_handle, stop) = StopHandle::new();

        let result = timeout(Duration::from_secs(5), worker.clone().spawn(stop))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(TriageError::Unauthorized(_))));
        assert_eq!(mailbox.list_calls(), 1);
    }
}
