// Layered configuration: defaults, optional TOML file, CLI flag overrides

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::release_repo::DEFAULT_RELEASE_URL;

/// Config file read when neither `--config` nor `CONFIG_FILE` is given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub kubernetes: KubernetesConfig,
    pub scrape: ScrapeConfig,
    pub release: ReleaseConfig,
    pub registry: RegistryConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// `host:port`; an empty host (`:9637`) listens on all interfaces.
    pub listen_address: String,
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: ":9637".into(),
            metrics_path: "/metrics".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubernetesConfig {
    pub in_cluster: bool,
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval_secs: u64,
    /// Images checked in parallel per cycle.
    pub concurrency: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELEASE_URL.into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub timeout_secs: u64,
    /// `n` query parameter for tag list pages.
    pub page_size: u32,
    /// Listings needing more pages fail.
    pub max_pages: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            page_size: 100,
            max_pages: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// trace, debug, info, warn, error (fatal and panic map to error).
    pub level: String,
    /// plain or json.
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "plain".into(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal", "panic"];
const LOG_FORMATS: &[&str] = &["plain", "json"];

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub in_cluster: bool,
    pub kubeconfig: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub listen_address: Option<String>,
    pub metrics_path: Option<String>,
}

impl AppConfig {
    /// Reads `path` when given (must exist), else `config.toml` if present,
    /// else defaults. The result is not validated; call `validate` after
    /// applying overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let s = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("reading config file {}: {}", path.display(), e)
                })?;
                Self::parse(&s)
            }
            None => match std::fs::read_to_string(DEFAULT_CONFIG_FILE) {
                Ok(s) => Self::parse(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config = Self::parse(s)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.in_cluster {
            self.kubernetes.in_cluster = true;
        }
        if let Some(v) = overrides.kubeconfig {
            self.kubernetes.kubeconfig = Some(v);
        }
        if let Some(v) = overrides.interval_secs {
            self.scrape.interval_secs = v;
        }
        if let Some(v) = overrides.log_level {
            self.log.level = v;
        }
        if let Some(v) = overrides.log_format {
            self.log.format = v;
        }
        if let Some(v) = overrides.listen_address {
            self.server.listen_address = v;
        }
        if let Some(v) = overrides.metrics_path {
            self.server.metrics_path = v;
        }
    }

    /// Socket address for `server.listen_address`; `:port` binds 0.0.0.0.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = &self.server.listen_address;
        let full = match addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => addr.clone(),
        };
        full.parse()
            .map_err(|e| anyhow::anyhow!("server.listen_address {addr:?} is invalid: {e}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;
        let path = &self.server.metrics_path;
        anyhow::ensure!(
            path.starts_with('/') && path != "/" && path != "/version",
            "server.metrics_path must start with '/' and not clash with / or /version, got {path:?}"
        );
        anyhow::ensure!(
            self.scrape.interval_secs > 0,
            "scrape.interval_secs must be > 0, got {}",
            self.scrape.interval_secs
        );
        anyhow::ensure!(
            self.scrape.concurrency > 0,
            "scrape.concurrency must be > 0, got {}",
            self.scrape.concurrency
        );
        anyhow::ensure!(
            !self.release.url.is_empty(),
            "release.url must be non-empty"
        );
        anyhow::ensure!(
            self.release.timeout_secs > 0,
            "release.timeout_secs must be > 0, got {}",
            self.release.timeout_secs
        );
        anyhow::ensure!(
            self.registry.timeout_secs > 0,
            "registry.timeout_secs must be > 0, got {}",
            self.registry.timeout_secs
        );
        anyhow::ensure!(
            self.registry.page_size > 0,
            "registry.page_size must be > 0, got {}",
            self.registry.page_size
        );
        anyhow::ensure!(
            self.registry.max_pages > 0,
            "registry.max_pages must be > 0, got {}",
            self.registry.max_pages
        );
        anyhow::ensure!(
            LOG_LEVELS.contains(&self.log.level.as_str()),
            "log.level must be one of {}, got {:?}",
            LOG_LEVELS.join(", "),
            self.log.level
        );
        anyhow::ensure!(
            LOG_FORMATS.contains(&self.log.format.as_str()),
            "log.format must be plain or json, got {:?}",
            self.log.format
        );
        Ok(())
    }
}
