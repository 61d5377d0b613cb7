// Registry tag listing over the Docker Registry HTTP API v2

pub mod auth;
pub mod coordinate;

pub use coordinate::{RegistryCoordinate, ResolveError, resolve};

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, LINK, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::version::USER_AGENT;

/// Lists the published tags of a repository.
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn list_tags(&self, coordinate: &RegistryCoordinate) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// HTTP tag source. Follows anonymous bearer challenges and `Link` pagination
/// on the registry's own origin, for at most `max_pages` pages per listing.
pub struct RegistryRepo {
    client: reqwest::Client,
    page_size: u32,
    max_pages: usize,
}

impl RegistryRepo {
    pub fn new(timeout: Duration, page_size: u32, max_pages: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            page_size,
            max_pages,
        })
    }

    async fn send(&self, url: &Url, token: Option<&str>) -> reqwest::Result<reqwest::Response> {
        let mut req = self.client.get(url.clone());
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        req.send().await
    }

    /// GET with one retry after answering a bearer challenge. The token is kept
    /// in `token` for the remaining pages of the same listing.
    async fn get(&self, url: &Url, token: &mut Option<String>) -> anyhow::Result<reqwest::Response> {
        let res = self.send(url, token.as_deref()).await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res.error_for_status()?);
        }

        let challenge = res
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(auth::parse_bearer_challenge)
            .ok_or_else(|| anyhow!("registry requires authentication for {url}"))?;
        trace!(realm = %challenge.realm, scope = ?challenge.scope, "answering bearer challenge");

        let fresh = self.fetch_token(&challenge).await?;
        let res = self.send(url, Some(&fresh)).await?.error_for_status()?;
        *token = Some(fresh);
        Ok(res)
    }

    async fn fetch_token(&self, challenge: &auth::BearerChallenge) -> anyhow::Result<String> {
        let mut realm = Url::parse(&challenge.realm)
            .with_context(|| format!("invalid token realm {}", challenge.realm))?;
        {
            let mut query = realm.query_pairs_mut();
            if let Some(service) = &challenge.service {
                query.append_pair("service", service);
            }
            if let Some(scope) = &challenge.scope {
                query.append_pair("scope", scope);
            }
        }

        let res: auth::TokenResponse = self
            .client
            .get(realm)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        res.into_token()
            .ok_or_else(|| anyhow!("token endpoint {} returned no token", challenge.realm))
    }
}

#[async_trait]
impl TagSource for RegistryRepo {
    async fn list_tags(&self, coordinate: &RegistryCoordinate) -> anyhow::Result<Vec<String>> {
        let mut url = coordinate
            .endpoint
            .join(&format!("v2/{}/tags/list", coordinate.repository))?;
        url.query_pairs_mut()
            .append_pair("n", &self.page_size.to_string());

        let origin = coordinate.endpoint.origin();
        let mut visited = HashSet::new();
        let mut tags = Vec::new();
        let mut token = None;
        let mut next = Some(url);
        while let Some(url) = next.take() {
            if visited.len() >= self.max_pages {
                bail!("tag list of {} exceeds {} pages", coordinate.repository, self.max_pages);
            }
            visited.insert(url.clone());

            let res = self.get(&url, &mut token).await?;
            next = match next_link(res.headers(), &url) {
                Some(link) if link.origin() != origin => {
                    bail!("next page {link} is not on registry {}", coordinate.endpoint)
                }
                Some(link) if visited.contains(&link) => {
                    debug!(%link, "tag list pagination loops back; stopping");
                    None
                }
                link => link,
            };
            let page: TagList = res
                .json()
                .await
                .with_context(|| format!("decoding tag list from {url}"))?;
            tags.extend(page.tags.unwrap_or_default());
        }

        debug!(
            endpoint = %coordinate.endpoint,
            repository = %coordinate.repository,
            tags_count = tags.len(),
            "listed tags"
        );
        Ok(tags)
    }
}

/// Extracts the `rel="next"` target of a `Link` header, resolved against `base`.
fn next_link(headers: &HeaderMap, base: &Url) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find(|link| link.contains("rel=\"next\"") || link.contains("rel=next"))
        .and_then(|link| {
            let start = link.find('<')? + 1;
            let end = link[start..].find('>')? + start;
            base.join(&link[start..end]).ok()
        })
}
