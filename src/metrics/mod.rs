// Exporter metric registry: explicit Registry shared by the worker and the HTTP responder

mod images;
mod snapshot;

pub use images::{ImageGauges, ImageState};
pub use snapshot::SnapshotGauge;

use prometheus::{Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::models::{
    CycleCounters, LABEL_CURRENT_VERSION, LABEL_IMAGE, LABEL_RUNNING_VERSION, MetricRecord,
};

pub const NAMESPACE: &str = "kubeversion";

const IMAGE_LABELS: &[&str] = &[LABEL_IMAGE, LABEL_RUNNING_VERSION, LABEL_CURRENT_VERSION];
const CLUSTER_LABELS: &[&str] = &[LABEL_RUNNING_VERSION, LABEL_CURRENT_VERSION];

/// Write side used by the checks. Every call replaces the whole set for its kind.
pub trait MetricPublisher: Send + Sync {
    fn replace_cluster(&self, record: MetricRecord);
    /// Publishes the counters of an image batch together with its records.
    /// `None` keeps the previous record set.
    fn replace_images(&self, counters: CycleCounters, records: Option<Vec<MetricRecord>>);
}

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    cluster_info: SnapshotGauge,
    images: ImageGauges,
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(NAMESPACE)
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cluster_info = SnapshotGauge::new(
            opts("cluster_info", "Information for the cluster"),
            CLUSTER_LABELS,
        )?;
        let images = ImageGauges::new(
            opts("image_info", "Information for the image"),
            IMAGE_LABELS,
            opts("images_total", "Total number of images"),
            opts(
                "images_success_total",
                "Total number of successfully processed images",
            ),
            opts(
                "images_error_total",
                "Total number of images with an error during the processing",
            ),
        )?;

        registry.register(Box::new(cluster_info.clone()))?;
        registry.register(Box::new(images.clone()))?;

        Ok(Self {
            registry,
            cluster_info,
            images,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered family.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn cluster_records(&self) -> Arc<Vec<MetricRecord>> {
        self.cluster_info.snapshot()
    }

    pub fn image_records(&self) -> Arc<Vec<MetricRecord>> {
        self.images.snapshot().records.clone()
    }

    pub fn image_counters(&self) -> CycleCounters {
        self.images.snapshot().counters
    }
}

impl MetricPublisher for Metrics {
    fn replace_cluster(&self, record: MetricRecord) {
        self.cluster_info.replace(vec![record]);
    }

    fn replace_images(&self, counters: CycleCounters, records: Option<Vec<MetricRecord>>) {
        self.images.replace(counters, records);
    }
}
