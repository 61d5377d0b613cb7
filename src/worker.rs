// Background reconciliation loop: cluster check, image check, sleep, repeat.
// The interval is the delay after a cycle completes; slow cycles push the next
// one back instead of overlapping it.

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tracing::{error, info, instrument};

use crate::checks;
use crate::kube_repo::Inventory;
use crate::metrics::MetricPublisher;
use crate::models::CycleCounters;
use crate::registry_repo::TagSource;
use crate::release_repo::ReleaseFeed;

/// Collaborators the checks read from, and where results are published.
pub struct WorkerDeps {
    pub inventory: Arc<dyn Inventory>,
    pub releases: Arc<dyn ReleaseFeed>,
    pub tags: Arc<dyn TagSource>,
    pub publisher: Arc<dyn MetricPublisher>,
}

pub struct WorkerConfig {
    pub interval_secs: u64,
    /// Images checked in parallel; 1 keeps the sequential behavior.
    pub concurrency: usize,
}

/// What one cycle achieved. `None` means that check aborted for this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cluster_published: bool,
    pub images: Option<CycleCounters>,
}

pub struct Worker {
    deps: WorkerDeps,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(deps: WorkerDeps, config: WorkerConfig) -> Self {
        Self { deps, config }
    }

    /// Runs exactly one cycle. The cluster check always finishes before the
    /// image check starts.
    pub async fn run_cycle(&self) -> CycleReport {
        let WorkerDeps {
            inventory,
            releases,
            tags,
            publisher,
        } = &self.deps;
        let started = Instant::now();

        info!("Start checking Kubernetes for newer version");
        let cluster_published =
            match checks::check_cluster(inventory.as_ref(), releases.as_ref(), publisher.as_ref())
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    let e = format!("{e:#}");
                    error!(error = %e, operation = "check_cluster", "cluster check failed");
                    false
                }
            };
        info!("Finished checking Kubernetes for new version");

        info!("Start checking images for new versions");
        let images = match checks::check_images(
            inventory.as_ref(),
            tags.as_ref(),
            publisher.as_ref(),
            self.config.concurrency,
        )
        .await
        {
            Ok(counters) => Some(counters),
            Err(e) => {
                let e = format!("{e:#}");
                error!(error = %e, operation = "check_images", "image check failed");
                None
            }
        };
        info!(
            images_total = images.map(|c| c.total),
            images_success_total = images.map(|c| c.succeeded),
            images_error_total = images.map(|c| c.failed),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished checking images for new versions"
        );

        CycleReport {
            cluster_published,
            images,
        }
    }
}

/// Spawns the loop. It stops when `shutdown_rx` fires (or its sender is
/// dropped), which is observed between cycles only.
pub fn spawn(worker: Worker, shutdown_rx: oneshot::Receiver<()>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(worker, shutdown_rx))
}

#[instrument(skip_all, fields(interval_secs = worker.config.interval_secs))]
async fn run(worker: Worker, mut shutdown_rx: oneshot::Receiver<()>) {
    let interval = Duration::from_secs(worker.config.interval_secs);
    loop {
        worker.run_cycle().await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown_rx => {
                tracing::debug!("Worker shutting down");
                break;
            }
        }
    }
}
