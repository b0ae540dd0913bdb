use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 1337;

/// Command line of the server binary.
#[derive(Debug, Parser)]
#[command(name = "webserver", about = "Minimal HTTP/1.0 server for machine settings")]
pub struct Cli {
    /// Address to bind
    #[arg(default_value_t = DEFAULT_ADDRESS)]
    pub address: IpAddr,

    /// Port to bind
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// YAML settings document served on GET
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Deadline in seconds for reading a request
    #[arg(long, value_name = "SECS")]
    pub read_timeout: Option<u64>,

    /// Deadline in seconds for writing a response
    #[arg(long, value_name = "SECS")]
    pub write_timeout: Option<u64>,

    /// Upper bound in seconds on a whole exchange
    #[arg(long, value_name = "SECS")]
    pub max_lifetime: Option<u64>,
}

/// Per-connection deadlines. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionLimits {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub bind_port: u16,
    pub limits: ConnectionLimits,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.bind_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_ADDRESS,
            bind_port: DEFAULT_PORT,
            limits: ConnectionLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub settings_path: Option<PathBuf>,
}

/// On-disk shape of `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub settings: Option<PathBuf>,
    pub limits: FileLimits,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileLimits {
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("invalid configuration file")
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text)
    }
}

impl Config {
    /// Builds the configuration from the command line, reading `--config` if given.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    /// Command line values win over the file.
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        let secs = |flag: Option<u64>, file: Option<u64>| flag.or(file).map(Duration::from_secs);

        Self {
            server: ServerConfig {
                bind_address: cli.address,
                bind_port: cli.port,
                limits: ConnectionLimits {
                    read_timeout: secs(cli.read_timeout, file.limits.read_timeout_secs),
                    write_timeout: secs(cli.write_timeout, file.limits.write_timeout_secs),
                    max_lifetime: secs(cli.max_lifetime, file.limits.max_lifetime_secs),
                },
            },
            settings_path: cli.settings.clone().or(file.settings),
        }
    }
}
