mod ai;
mod app;
mod config;
mod domain;
#[cfg(test)]
mod http_stub;
mod infrastructure;
mod mailbox;
mod triage;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let (stop, _) = shutdown::StopHandle::new();
    shutdown::install_signal_handlers(stop.clone());

    let app = app::CalmMailApp::initialize(config, paths, stop).await?;
    app.run().await
}
