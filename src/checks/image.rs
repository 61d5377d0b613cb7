// Image check: running tag of every distinct image vs. newest tag in its registry

use futures_util::{StreamExt, stream};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::kube_repo::Inventory;
use crate::metrics::MetricPublisher;
use crate::models::{CycleCounters, ImageReference, MetricRecord, ReferenceError};
use crate::registry_repo::{self, ResolveError, TagSource};
use crate::version_compare::{decide, sort_versions};

/// Why a single image produced no record. Never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Malformed(#[from] ReferenceError),
    #[error(transparent)]
    Unresolvable(#[from] ResolveError),
    #[error("could not get tags for {repository}: {cause:#}")]
    Tags {
        repository: String,
        cause: anyhow::Error,
    },
    #[error("registry returned no tags for {0}")]
    NoTags(String),
}

/// Checks one image reference against its registry.
pub async fn check_image(
    tags: &dyn TagSource,
    reference: &str,
) -> Result<MetricRecord, ImageError> {
    let image = ImageReference::parse(reference)?;
    debug!(image = image.name, tag = image.tag, "Split image {reference}");

    let coordinate = registry_repo::resolve(image.name)?;
    debug!(
        registry = %coordinate.endpoint,
        repository = %coordinate.repository,
        "Resolved registry for {reference}"
    );

    let mut available = tags
        .list_tags(&coordinate)
        .await
        .map_err(|cause| ImageError::Tags {
            repository: coordinate.repository.clone(),
            cause,
        })?;
    sort_versions(&mut available);
    let latest = available
        .last()
        .ok_or_else(|| ImageError::NoTags(coordinate.repository.clone()))?;

    let decision = decide(image.tag, latest);
    info!(
        image = reference,
        running_version = %decision.versions.running,
        current_version = %decision.versions.latest,
        newer = decision.is_newer,
        "Received version for image"
    );
    Ok(MetricRecord::image(reference, &decision))
}

/// Checks every distinct running image, at most `concurrency` at a time
/// (1 = strictly sequential). Counters are published whenever the inventory
/// listing succeeds, in the same swap as the image set. The set is replaced
/// only when at least one image succeeded, and then contains exactly this
/// cycle's successful records.
pub async fn check_images(
    inventory: &dyn Inventory,
    tags: &dyn TagSource,
    publisher: &dyn MetricPublisher,
    concurrency: usize,
) -> anyhow::Result<CycleCounters> {
    let images: BTreeSet<String> = inventory
        .list_running_images()
        .await
        .map_err(|e| e.context("could not get running images in the Kubernetes cluster"))?
        .into_iter()
        .collect();
    debug!(images = ?images, "Received images");

    let mut counters = CycleCounters {
        total: images.len() as u64,
        ..CycleCounters::default()
    };

    let results: Vec<(String, Result<MetricRecord, ImageError>)> = stream::iter(images)
        .map(|reference| async move {
            let result = check_image(tags, &reference).await;
            (reference, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut records = Vec::with_capacity(results.len());
    for (reference, result) in results {
        match result {
            Ok(record) => {
                counters.succeeded += 1;
                records.push(record);
            }
            Err(e) => {
                warn!(image = %reference, error = %e, "image check failed");
                counters.failed += 1;
            }
        }
    }

    if records.is_empty() {
        warn!(
            images_total = counters.total,
            "no image succeeded; keeping previous image metrics"
        );
        publisher.replace_images(counters, None);
    } else {
        publisher.replace_images(counters, Some(records));
    }
    Ok(counters)
}
