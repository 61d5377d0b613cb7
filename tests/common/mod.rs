// Shared test helpers: in-memory collaborators for the worker and checks

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use kubeversion_exporter::kube_repo::Inventory;
use kubeversion_exporter::metrics::Metrics;
use kubeversion_exporter::registry_repo::{RegistryCoordinate, TagSource};
use kubeversion_exporter::release_repo::ReleaseFeed;
use kubeversion_exporter::worker::{Worker, WorkerConfig, WorkerDeps};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Inventory whose answers can be changed between cycles. `None` = backend error.
#[derive(Default)]
pub struct FakeInventory {
    pub images: Mutex<Option<Vec<String>>>,
    pub platform: Mutex<Option<String>>,
    pub image_calls: AtomicUsize,
    pub platform_calls: AtomicUsize,
}

impl FakeInventory {
    pub fn new(images: &[&str], platform: &str) -> Self {
        Self {
            images: Mutex::new(Some(images.iter().map(|s| s.to_string()).collect())),
            platform: Mutex::new(Some(platform.to_string())),
            ..Default::default()
        }
    }

    pub fn set_images(&self, images: Option<&[&str]>) {
        *self.images.lock().unwrap() = images.map(|i| i.iter().map(|s| s.to_string()).collect());
    }

    pub fn set_platform(&self, platform: Option<&str>) {
        *self.platform.lock().unwrap() = platform.map(str::to_string);
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn list_running_images(&self) -> anyhow::Result<Vec<String>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("pods list forbidden"))
    }

    async fn platform_version(&self) -> anyhow::Result<String> {
        self.platform_calls.fetch_add(1, Ordering::SeqCst);
        self.platform
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("api server unreachable"))
    }
}

#[derive(Default)]
pub struct FakeReleases {
    pub latest: Mutex<Option<String>>,
}

impl FakeReleases {
    pub fn new(latest: &str) -> Self {
        Self {
            latest: Mutex::new(Some(latest.to_string())),
        }
    }

    pub fn set(&self, latest: Option<&str>) {
        *self.latest.lock().unwrap() = latest.map(str::to_string);
    }
}

#[async_trait]
impl ReleaseFeed for FakeReleases {
    async fn latest_release(&self) -> anyhow::Result<String> {
        self.latest
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("release feed timed out"))
    }
}

/// Tags per repository; repositories not present are unreachable.
#[derive(Default)]
pub struct FakeTags {
    pub tags: Mutex<HashMap<String, Vec<String>>>,
    pub requested: Mutex<Vec<RegistryCoordinate>>,
}

impl FakeTags {
    pub fn with(mut self, repository: &str, tags: &[&str]) -> Self {
        self.tags.get_mut().unwrap().insert(
            repository.to_string(),
            tags.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn remove(&self, repository: &str) {
        self.tags.lock().unwrap().remove(repository);
    }
}

#[async_trait]
impl TagSource for FakeTags {
    async fn list_tags(&self, coordinate: &RegistryCoordinate) -> anyhow::Result<Vec<String>> {
        self.requested.lock().unwrap().push(coordinate.clone());
        self.tags
            .lock()
            .unwrap()
            .get(&coordinate.repository)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", coordinate.endpoint))
    }
}

pub struct Harness {
    pub inventory: Arc<FakeInventory>,
    pub releases: Arc<FakeReleases>,
    pub tags: Arc<FakeTags>,
    pub metrics: Metrics,
}

impl Harness {
    pub fn new(inventory: FakeInventory, releases: FakeReleases, tags: FakeTags) -> Self {
        Self {
            inventory: Arc::new(inventory),
            releases: Arc::new(releases),
            tags: Arc::new(tags),
            metrics: Metrics::new().unwrap(),
        }
    }

    pub fn worker(&self, interval_secs: u64, concurrency: usize) -> Worker {
        Worker::new(
            WorkerDeps {
                inventory: self.inventory.clone(),
                releases: self.releases.clone(),
                tags: self.tags.clone(),
                publisher: Arc::new(self.metrics.clone()),
            },
            WorkerConfig {
                interval_secs,
                concurrency,
            },
        )
    }
}
