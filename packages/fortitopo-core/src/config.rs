//! Connection and topology configuration.
//!
//! Settings are layered with priority:
//! 1. Command-line overrides
//! 2. Environment variables (`FORTITOPO_HOST`, `FORTITOPO_PORT`, `FORTITOPO_TOKEN`, `FORTITOPO_MODE`)
//! 3. Config file (`~/.config/fortitopo/config.toml`)
//! 4. Default values

use crate::topology::TopologyOptions;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTPS admin port of the appliances
pub const DEFAULT_PORT: u16 = 11443;

/// Request timeout when talking to a FortiGate directly
const DIRECT_TIMEOUT_SECS: u64 = 8;

/// Request timeout for FortiManager JSON-RPC calls (proxied calls are slower)
const MANAGER_TIMEOUT_SECS: u64 = 15;

const ENV_HOST: &str = "FORTITOPO_HOST";
const ENV_PORT: &str = "FORTITOPO_PORT";
const ENV_TOKEN: &str = "FORTITOPO_TOKEN";
const ENV_MODE: &str = "FORTITOPO_MODE";

/// How records are fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// REST API of the FortiGate itself
    #[default]
    Direct,
    /// JSON-RPC proxy through a FortiManager
    Manager,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Direct => write!(f, "direct"),
            ConnectionMode::Manager => write!(f, "manager"),
        }
    }
}

impl std::str::FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "fortigate" => Ok(ConnectionMode::Direct),
            "manager" | "fmg" | "fortimanager" => Ok(ConnectionMode::Manager),
            other => Err(format!("unknown connection mode '{}'", other)),
        }
    }
}

/// Where the connection settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from config file
    ConfigFile,
    /// Loaded from environment variables
    Environment,
    /// Given on the command line
    CommandLine,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::ConfigFile => write!(f, "config file"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    connection: Option<ConnectionSection>,
    topology: Option<TopologyOptions>,
}

/// One layer of connection settings; unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionSection {
    pub mode: Option<ConnectionMode>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl ConnectionSection {
    /// Read the environment layer through `get`.
    pub fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode = non_empty(ENV_MODE).and_then(|m| match m.parse() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", ENV_MODE, e);
                None
            }
        });
        let port = non_empty(ENV_PORT).and_then(|p| match p.parse() {
            Ok(port) => Some(port),
            Err(e) => {
                tracing::warn!("Ignoring {}={}: {}", ENV_PORT, p, e);
                None
            }
        });

        Self {
            mode,
            host: non_empty(ENV_HOST),
            port,
            token: non_empty(ENV_TOKEN),
            verify_tls: None,
            timeout_secs: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.token.is_none()
            && self.verify_tls.is_none()
            && self.timeout_secs.is_none()
    }
}

/// Effective connection settings, passed explicitly to the data source.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub mode: ConnectionMode,
    pub host: String,
    pub port: u16,
    pub token: String,
    /// Appliances ship self-signed certificates, so verification is opt-in
    pub verify_tls: bool,
    pub timeout: Duration,
    /// Highest-priority layer that contributed a setting
    pub source: ConfigSource,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("mode", &self.mode)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("source", &self.source)
            .finish()
    }
}

impl ConnectionConfig {
    /// `https://<host>:<port>`
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// Merge layers, lowest priority first.
    pub fn from_layers(layers: &[(ConfigSource, ConnectionSection)]) -> Result<Self> {
        let mut merged = ConnectionSection::default();
        let mut source = ConfigSource::Default;

        for (layer_source, layer) in layers {
            if layer.is_empty() {
                continue;
            }
            source = *layer_source;
            let layer = layer.clone();
            merged.mode = layer.mode.or(merged.mode);
            merged.host = layer.host.or(merged.host);
            merged.port = layer.port.or(merged.port);
            merged.token = layer.token.or(merged.token);
            merged.verify_tls = layer.verify_tls.or(merged.verify_tls);
            merged.timeout_secs = layer.timeout_secs.or(merged.timeout_secs);
        }

        let Some(host) = merged.host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) else {
            bail!(
                "No host configured. Pass --host, set {} or add it to {}",
                ENV_HOST,
                get_config_file_path_string()
            );
        };
        let Some(token) = merged.token.filter(|t| !t.trim().is_empty()) else {
            bail!(
                "No API token configured. Pass --token, set {} or add it to {}",
                ENV_TOKEN,
                get_config_file_path_string()
            );
        };

        let mode = merged.mode.unwrap_or_default();
        let default_timeout = match mode {
            ConnectionMode::Direct => DIRECT_TIMEOUT_SECS,
            ConnectionMode::Manager => MANAGER_TIMEOUT_SECS,
        };

        Ok(Self {
            mode,
            host,
            port: merged.port.unwrap_or(DEFAULT_PORT),
            token: token.trim().to_string(),
            verify_tls: merged.verify_tls.unwrap_or(false),
            timeout: Duration::from_secs(merged.timeout_secs.unwrap_or(default_timeout)),
            source,
        })
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("fortitopo").join("config.toml"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Resolve connection settings from defaults, config file, environment and `overrides`.
pub fn load_connection_config(overrides: ConnectionSection) -> Result<ConnectionConfig> {
    let file = load_config_file()
        .and_then(|c| c.connection)
        .unwrap_or_default();
    let env = ConnectionSection::from_env_with(|key| std::env::var(key).ok());

    let config = ConnectionConfig::from_layers(&[
        (ConfigSource::ConfigFile, file),
        (ConfigSource::Environment, env),
        (ConfigSource::CommandLine, overrides),
    ])?;

    tracing::debug!("Connection settings: {:?}", config);
    if !config.verify_tls {
        tracing::debug!("TLS certificate verification disabled for {}", config.host);
    }
    Ok(config)
}

/// Topology options from the config file's `[topology]` section.
pub fn load_topology_options() -> TopologyOptions {
    load_config_file()
        .and_then(|c| c.topology)
        .unwrap_or_default()
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/fortitopo/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# FortiTopology Configuration
# Place this file at: ~/.config/fortitopo/config.toml

[connection]
# "direct" (FortiGate REST API) or "manager" (FortiManager JSON-RPC proxy)
# mode = "direct"
# host = "192.168.1.99"
# port = 11443
# REST API token; prefer the FORTITOPO_TOKEN environment variable
# token = ""
# verify_tls = false
# timeout_secs = 8

[topology]
# What to do when two devices share a name or sanitized serial:
# "keep_first" (default) or "last_write_wins"
# collision_policy = "keep_first"
"#
    .to_string()
}
