use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{task::JoinHandle, time::timeout};

use crate::{
    ai::OllamaClient,
    config::{AppConfig, RoutingConfig},
    infrastructure::{
        credentials::load_access_token, directories::ResolvedPaths,
        instance_guard::InstanceGuard, shutdown::StopHandle,
    },
    mailbox::GmailClient,
    triage::{DecisionEngine, TriageError, TriageWorker},
};

const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);

pub struct CalmMailApp {
    worker: Arc<TriageWorker>,
    stop: StopHandle,
    config: Arc<AppConfig>,
    routing: Arc<RoutingConfig>,
    _guard: Option<InstanceGuard>,
}

impl CalmMailApp {
    pub async fn initialize(config: AppConfig, paths: ResolvedPaths, stop: StopHandle) -> Result<Self> {
        let guard = if config.skip_instance_guard {
            tracing::warn!(target: "lifecycle", "instance guard skipped because SKIP_INSTANCE_GUARD=1");
            None
        } else {
            Some(InstanceGuard::acquire(&paths.data_dir)?)
        };

        let routing = RoutingConfig::load(Path::new(&config.routing_path))
            .with_context(|| format!("failed to load routing config {}", config.routing_path))?;
        let routing = Arc::new(routing);

        let access_token =
            load_access_token(&config.mailbox).context("mailbox credentials are required")?;

        let http = Client::builder()
            .user_agent(format!("calm-mail/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mailbox = GmailClient::new(http.clone(), &config.mailbox, access_token);
        let oracle = OllamaClient::new(http, &config.ollama)
            .context("invalid OLLAMA_BASE_URL")?;
        let engine = Arc::new(DecisionEngine::new(Arc::new(oracle)));

        let worker = Arc::new(TriageWorker::new(
            Arc::new(mailbox),
            engine,
            routing.clone(),
            config.run.clone(),
        ));

        Ok(Self {
            worker,
            stop,
            config: Arc::new(config),
            routing,
            _guard: guard,
        })
    }

    pub async fn run(self) -> Result<()> {
        let CalmMailApp {
            worker,
            stop,
            config,
            routing,
            _guard,
        } = self;

        tracing::info!(
            target: "lifecycle",
            model = %routing.model,
            blacklist = routing.blacklist_domains.len(),
            labels = routing.fixed_labels.len(),
            batch_size = routing.batch_size,
            mode = config.run.mode.as_str(),
            "calm-mail starting"
        );

        // ends once the worker is dropped
        let mut states = worker.subscribe_state();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                tracing::debug!(target: "lifecycle", ?state, "triage loop state");
            }
        });

        let mut stop_listener = stop.subscribe();
        let mut worker_handle = worker.spawn(stop.subscribe());

        let finished = tokio::select! {
            res = &mut worker_handle => Some(res),
            _ = stop_listener.stopped() => {
                tracing::info!(target: "lifecycle", "stop requested; letting in-flight work finish");
                None
            }
        };

        let outcome = match finished {
            Some(res) => res,
            None => {
                // an in-flight oracle or mailbox call is allowed to run to its own timeout
                let grace = config.ollama.timeout.max(config.mailbox.timeout) + SHUTDOWN_SLACK;
                match wait_for_worker(&mut worker_handle, grace).await {
                    Some(res) => res,
                    None => {
                        tracing::warn!(
                            target: "lifecycle",
                            "triage worker did not stop within {:?}; aborting",
                            grace
                        );
                        worker_handle.abort();
                        Ok(Ok(()))
                    }
                }
            }
        };

        tracing::info!(target: "lifecycle", "calm-mail stopped");
        match outcome {
            Ok(result) => result.context("triage stopped"),
            Err(err) if err.is_panic() => Err(anyhow::anyhow!("triage worker panicked")),
            Err(_) => Ok(()),
        }
    }
}

async fn wait_for_worker(
    handle: &mut JoinHandle<Result<(), TriageError>>,
    grace: Duration,
) -> Option<Result<Result<(), TriageError>, tokio::task::JoinError>> {
    timeout(grace, handle).await.ok()
}
