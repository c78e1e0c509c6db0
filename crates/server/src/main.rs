use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use docscribe_common::config::ServerAppConfig;
use docscribe_server::{build_router, AppState};

const DEFAULT_CONFIG: &str = "docscribe.toml";

#[derive(Parser, Debug)]
#[command(name = "docscribe-server", about = "Upload files and get their text back")]
struct Args {
    /// Config file. Without it `docscribe.toml` is used if present.
    #[arg(long, env = "DOCSCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config_path, required) = match args.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let mut config = ServerAppConfig::load(&config_path, required)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    docscribe_common::logging::init("docscribe_server=info,tower_http=info", &config.log.ignore);

    for dir in [&config.server.upload_dir, &config.server.output_dir, &config.server.scratch_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }

    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;

    tracing::info!("listening on {bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
