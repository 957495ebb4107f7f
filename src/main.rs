mod ai;
mod app;
mod config;
mod domain;
mod host;
mod infrastructure;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::FeedSweeperApp::initialize(config, paths, shutdown)?;
    app.run().await?;

    // A blocking stdin read can outlive the runtime; leave without waiting on it.
    std::process::exit(0)
}
