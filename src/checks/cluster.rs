// Platform check: running API server version vs. latest published release

use anyhow::Context;
use tracing::info;

use crate::kube_repo::Inventory;
use crate::metrics::MetricPublisher;
use crate::models::MetricRecord;
use crate::release_repo::ReleaseFeed;
use crate::version_compare::decide;

/// Compares the running platform version with the latest release and, on
/// success, replaces the platform metric set with the single resulting record.
/// On error nothing is published and the previous set stays exposed.
pub async fn check_cluster(
    inventory: &dyn Inventory,
    releases: &dyn ReleaseFeed,
    publisher: &dyn MetricPublisher,
) -> anyhow::Result<MetricRecord> {
    let running = inventory
        .platform_version()
        .await
        .context("could not get running Kubernetes version")?;
    let latest = releases
        .latest_release()
        .await
        .context("could not get current Kubernetes version")?;

    let decision = decide(&running, &latest);
    info!(
        running_version = %decision.versions.running,
        current_version = %decision.versions.latest,
        newer = decision.is_newer,
        "Received versions"
    );

    let record = MetricRecord::cluster(&decision);
    publisher.replace_cluster(record.clone());
    Ok(record)
}
