// Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

/// Exports the running version of the cluster and of every image in use,
/// together with the newest version available.
#[derive(Debug, Parser)]
#[command(name = "kubeversion-exporter")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CONFIG_FILE", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Authenticate inside the Kubernetes cluster (service account)
    #[arg(long, global = true)]
    pub cluster: bool,

    /// Path to the kubeconfig file to use
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Seconds to wait between two checks
    #[arg(long, global = true, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Log level: trace, debug, info, warn, error, fatal or panic
    #[arg(long = "loglevel", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log line format: plain or json
    #[arg(long = "logoutput", global = true, value_name = "FORMAT")]
    pub log_output: Option<String>,

    /// Address to listen on for the web interface and telemetry
    #[arg(long = "web.listen-address", global = true, value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", global = true, value_name = "PATH")]
    pub metrics_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the exporter (default)
    Run,
    /// Print version information
    Version,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            in_cluster: self.cluster,
            kubeconfig: self.kubeconfig.clone(),
            interval_secs: self.interval,
            log_level: self.log_level.clone(),
            log_format: self.log_output.clone(),
            listen_address: self.listen_address.clone(),
            metrics_path: self.metrics_path.clone(),
        }
    }
}
