use anyhow::{Context, Result};
use clap::Parser;
use kubeversion_exporter::*;
use std::sync::Arc;
use tokio::time::Duration;

/// How long to wait for the worker to notice shutdown before exiting anyway.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    if cli.command() == cli::Command::Version {
        println!("{}", version::info());
        return Ok(());
    }

    let mut app_config = config::AppConfig::load(cli.config.as_deref())?;
    app_config.apply(cli.overrides());
    app_config.validate()?;
    logging::init(&app_config.log);
    tracing::info!("{}", version::info());

    let kube_repo = Arc::new(
        kube_repo::KubeRepo::connect(
            app_config.kubernetes.in_cluster,
            app_config.kubernetes.kubeconfig.as_deref(),
        )
        .await
        .context("could not create API client for the Kubernetes cluster")?,
    );
    let release_repo = Arc::new(release_repo::GithubReleaseRepo::new(
        app_config.release.url.clone(),
        Duration::from_secs(app_config.release.timeout_secs),
    )?);
    let registry_repo = Arc::new(registry_repo::RegistryRepo::new(
        Duration::from_secs(app_config.registry.timeout_secs),
        app_config.registry.page_size,
        app_config.registry.max_pages,
    )?);
    let metrics = metrics::Metrics::new()?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::Worker::new(
            worker::WorkerDeps {
                inventory: kube_repo,
                releases: release_repo,
                tags: registry_repo,
                publisher: Arc::new(metrics.clone()),
            },
            worker::WorkerConfig {
                interval_secs: app_config.scrape.interval_secs,
                concurrency: app_config.scrape.concurrency,
            },
        ),
        shutdown_rx,
    );

    let app = routes::app(metrics, &app_config.server.metrics_path);
    let addr = app_config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server died unexpectedly")?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(WORKER_SHUTDOWN_GRACE, worker_handle)
        .await
        .is_err()
    {
        tracing::warn!("Worker still running a cycle; exiting without waiting");
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
