// Latest published platform release (GitHub releases API)

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;

use crate::version::USER_AGENT;

/// Default feed: latest Kubernetes release on GitHub.
pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/kubernetes/kubernetes/releases/latest";

/// Source of the newest published platform release.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_release(&self) -> anyhow::Result<String>;
}

/// Only the field the exporter needs from a GitHub release object.
#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
}

pub struct GithubReleaseRepo {
    client: reqwest::Client,
    url: String,
}

impl GithubReleaseRepo {
    /// `timeout` bounds the whole request (connect + body).
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseRepo {
    async fn latest_release(&self) -> anyhow::Result<String> {
        let release: GithubRelease = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if release.tag_name.trim().is_empty() {
            return Err(anyhow!("release feed {} returned an empty tag", self.url));
        }
        Ok(release.tag_name)
    }
}
