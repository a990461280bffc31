//! Vigil daemon binary
//!
//! Loads the configuration, wires up the configured channels, and runs
//! the session coordinator until interrupted.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil::{Archiver, ChannelWorker, FileRegistry, SessionCoordinator, VigilConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vigil v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vigil.json".to_string());
    let config = VigilConfig::load(Path::new(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;
    config.ensure_dirs().context("creating working directories")?;

    let registry = Arc::new(FileRegistry::new(&config.locks_dir)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut coordinator = SessionCoordinator::new(
        registry.clone(),
        Archiver::new(&config.archive_dir),
        &config.tmp_dir,
        &config.session,
    );

    let mut workers = Vec::new();

    if let Some(video) = &config.video {
        let (worker, recorder) = ChannelWorker::video(
            "motion",
            video,
            &config.detection,
            registry.clone(),
            shutdown_rx.clone(),
        )?;
        coordinator.add_recorder("motion", recorder);
        workers.push(worker);
    }

    if let Some(audio) = &config.audio {
        let (worker, recorder) = ChannelWorker::audio(
            "noise",
            audio,
            &config.detection,
            registry.clone(),
            shutdown_rx.clone(),
        )?;
        coordinator.add_recorder("noise", recorder);
        workers.push(worker);
    }

    if let Some(switch) = &config.switch {
        workers.push(ChannelWorker::switch(
            "switch",
            switch,
            registry.clone(),
            shutdown_rx.clone(),
        ));
    }

    if workers.is_empty() {
        anyhow::bail!("no channels configured");
    }

    let handles: Vec<_> = workers.into_iter().map(ChannelWorker::spawn).collect();
    let coordinator_handle = tokio::spawn(coordinator.run(shutdown_rx));

    tracing::info!("Ready");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Interrupted, shutting down");

    shutdown_tx.send(true).ok();
    coordinator_handle.await.ok();
    for handle in handles {
        handle.await.ok();
    }

    tracing::info!("Done");
    Ok(())
}
