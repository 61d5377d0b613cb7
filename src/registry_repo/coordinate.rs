// Image name -> registry endpoint + repository path (structural heuristics, no I/O).

use url::Url;

/// Docker Hub registry API endpoint.
pub const DEFAULT_REGISTRY: &str = "https://registry-1.docker.io/";

const DOCKER_HUB_HOST: &str = "docker.io";

/// Where to ask for an image's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCoordinate {
    pub endpoint: Url,
    pub repository: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("could not get registry and repository for image {0}")]
    UnresolvableImage(String),
}

/// Resolves an image name (reference without tag) to its registry coordinate.
///
/// `nginx` -> Docker Hub `library/nginx`; `org/app` -> Docker Hub `org/app`;
/// `docker.io/org/app` -> Docker Hub `org/app`; `host/org/app` ->
/// `https://host` `org/app`. Any other shape is unresolvable.
pub fn resolve(image_name: &str) -> Result<RegistryCoordinate, ResolveError> {
    let unresolvable = || ResolveError::UnresolvableImage(image_name.to_string());

    let parts: Vec<&str> = image_name.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(unresolvable());
    }

    let (endpoint, repository) = match parts.as_slice() {
        [name] => (default_endpoint(), format!("library/{name}")),
        [org, name] => (default_endpoint(), format!("{org}/{name}")),
        [host, org, name] if *host == DOCKER_HUB_HOST => (default_endpoint(), format!("{org}/{name}")),
        [host, org, name] => (
            Url::parse(&format!("https://{host}")).map_err(|_| unresolvable())?,
            format!("{org}/{name}"),
        ),
        _ => return Err(unresolvable()),
    };

    Ok(RegistryCoordinate {
        endpoint,
        repository,
    })
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_REGISTRY).expect("DEFAULT_REGISTRY is a valid URL")
}
