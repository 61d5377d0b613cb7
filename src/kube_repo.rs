// Cluster inventory via the Kubernetes API (running images, API server version)

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

const POD_PAGE_SIZE: u32 = 500;

/// Source of the running platform version and the images currently deployed.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Distinct image references of all running containers.
    async fn list_running_images(&self) -> anyhow::Result<Vec<String>>;

    /// Version string reported by the platform (e.g. `v1.24.3`).
    async fn platform_version(&self) -> anyhow::Result<String>;
}

pub struct KubeRepo {
    client: Client,
}

impl KubeRepo {
    /// Builds the API client. `in_cluster` uses the pod's service account;
    /// otherwise `kubeconfig`, falling back to `KUBECONFIG` / `~/.kube/config`.
    pub async fn connect(in_cluster: bool, kubeconfig: Option<&Path>) -> anyhow::Result<Self> {
        let config = if in_cluster {
            info!("Using in-cluster configuration");
            Config::incluster()?
        } else if let Some(path) = kubeconfig {
            info!(kubeconfig = %path.display(), "Using kubeconfig file");
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        } else {
            info!("Using default kubeconfig");
            Config::from_kubeconfig(&KubeConfigOptions::default()).await?
        };
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Inventory for KubeRepo {
    async fn list_running_images(&self) -> anyhow::Result<Vec<String>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let mut images = BTreeSet::new();
        let mut params = ListParams::default().limit(POD_PAGE_SIZE);
        let mut pages = 0u32;

        loop {
            let list = pods.list(&params).await?;
            pages += 1;
            images.extend(
                list.items
                    .into_iter()
                    .filter_map(|pod| pod.spec)
                    .flat_map(|spec| spec.containers)
                    .filter_map(|container| container.image),
            );
            match list.metadata.continue_.filter(|token| !token.is_empty()) {
                Some(token) => params = params.continue_token(&token),
                None => break,
            }
        }

        debug!(
            operation = "list_running_images",
            pages,
            images_count = images.len(),
            "Listed pods"
        );
        Ok(images.into_iter().collect())
    }

    async fn platform_version(&self) -> anyhow::Result<String> {
        let info = self.client.apiserver_version().await?;
        Ok(info.git_version)
    }
}
