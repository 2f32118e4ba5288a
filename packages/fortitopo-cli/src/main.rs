//! FortiTopology CLI - draw.io topology maps of FortiGate fleets
//!
//! This binary can:
//! - Read managed switches and access points from a FortiGate, directly or via FortiManager
//! - Reconstruct how they are cabled together
//! - Write the result as a draw.io diagram
//! - Re-render saved inventory snapshots offline

mod snapshot;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fortitopo_core::config::{self, ConnectionSection};
use fortitopo_core::topology::{self, BuildProgress, ProgressCallback};
use fortitopo_core::{
    CollisionPolicy, ConnectionMode, DeviceClass, Inventory, ManagerClient, RecordSource,
    TopologyOptions,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fortitopo")]
#[command(author = "FortiTopology Contributors")]
#[command(version)]
#[command(about = "Draw.io topology maps of FortiGate, FortiSwitch and FortiAP fleets")]
#[command(long_about = "
FortiTopology reads the managed switches and access points of a FortiGate
(directly or through a FortiManager), works out how they are connected and
writes the result as a draw.io diagram.

Quick start:
  1. Direct:         FORTITOPO_TOKEN=... fortitopo map --host 192.168.1.99
  2. FortiManager:   fortitopo firewalls --mode manager --host 10.0.0.1
                     fortitopo map --mode manager --host 10.0.0.1 --firewall hq-fw
  3. Offline:        fortitopo render inventory.json
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Connection settings; anything omitted falls back to the environment and config file.
#[derive(Args, Clone, Default)]
pub struct ConnectionArgs {
    /// "direct" (FortiGate) or "manager" (FortiManager)
    #[arg(long)]
    pub mode: Option<ConnectionMode>,

    /// IP address or DNS name of the FortiGate / FortiManager
    #[arg(long)]
    pub host: Option<String>,

    /// HTTPS admin port
    #[arg(long)]
    pub port: Option<u16>,

    /// REST API token (prefer the FORTITOPO_TOKEN environment variable)
    #[arg(long)]
    pub token: Option<String>,

    /// Verify the appliance's TLS certificate
    #[arg(long)]
    pub verify_tls: bool,
}

impl ConnectionArgs {
    fn into_overrides(self) -> ConnectionSection {
        ConnectionSection {
            mode: self.mode,
            host: self.host,
            port: self.port,
            token: self.token,
            verify_tls: self.verify_tls.then_some(true),
            timeout_secs: None,
        }
    }
}

/// Where and how to write the diagram.
#[derive(Args, Clone, Default)]
pub struct DiagramArgs {
    /// Output file (default: topology_<hostname>.drawio)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// On name/serial collisions let the later device win instead of the first
    #[arg(long)]
    pub keep_last: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the live inventory and write a topology diagram
    Map {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        diagram: DiagramArgs,

        /// Firewall to map in manager mode (hostname, serial or label)
        #[arg(long)]
        firewall: Option<String>,

        /// Also save the fetched inventory as a JSON snapshot
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },

    /// Render a diagram from a saved inventory snapshot
    Render {
        /// Snapshot file written by `map --save-snapshot`
        snapshot: PathBuf,

        #[command(flatten)]
        diagram: DiagramArgs,
    },

    /// List the FortiGates managed by a FortiManager
    Firewalls {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fortitopo={},fortitopo_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Map {
            connection,
            diagram,
            firewall,
            save_snapshot,
        } => {
            cmd_map(
                &cli,
                connection.clone(),
                diagram,
                firewall.as_deref(),
                save_snapshot.as_deref(),
            )
            .await
        }
        Commands::Render { snapshot, diagram } => cmd_render(&cli, snapshot, diagram),
        Commands::Firewalls { connection } => cmd_firewalls(&cli, connection.clone()).await,
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_map(
    cli: &Cli,
    connection: ConnectionArgs,
    diagram: &DiagramArgs,
    firewall: Option<&str>,
    save_snapshot: Option<&Path>,
) -> Result<()> {
    let config = config::load_connection_config(connection.into_overrides())?;

    if let OutputFormat::Text = cli.format {
        println!("Connecting to {} ({} mode)...", config.host, config.mode);
    }

    let source = RecordSource::connect(&config, firewall)
        .await
        .context("Failed to connect")?;
    let inventory = source
        .fetch_inventory()
        .await
        .context("Failed to fetch inventory")?;

    if let Some(path) = save_snapshot {
        snapshot::save_snapshot(path, &inventory)?;
        if let OutputFormat::Text = cli.format {
            println!("Snapshot saved: {}", path.display());
        }
    }

    write_topology(cli, &inventory, diagram)
}

fn cmd_render(cli: &Cli, snapshot_path: &Path, diagram: &DiagramArgs) -> Result<()> {
    let inventory = snapshot::load_snapshot(snapshot_path)?;
    write_topology(cli, &inventory, diagram)
}

/// Build the topology, write the diagram and report the outcome.
fn write_topology(cli: &Cli, inventory: &Inventory, diagram: &DiagramArgs) -> Result<()> {
    let mut options: TopologyOptions = config::load_topology_options();
    if diagram.keep_last {
        options.collision_policy = CollisionPolicy::LastWriteWins;
    }

    let progress_callback: Option<ProgressCallback> = match cli.format {
        OutputFormat::Text => Some(Box::new(|progress: BuildProgress| {
            println!("  {}", progress.message);
        })),
        OutputFormat::Json => None,
    };

    let topology = topology::build_topology_with_progress(inventory, options, progress_callback);
    let document = topology.to_drawio().context("Failed to render diagram")?;

    let hostname = topology
        .gateway()
        .map(|gw| gw.display_name.as_str())
        .unwrap_or(fortitopo_core::topology::catalog::GATEWAY_HOSTNAME_FALLBACK);
    let path = diagram
        .output
        .clone()
        .unwrap_or_else(|| topology::default_output_name(hostname));

    topology::write_document(&path, &document)?;

    match cli.format {
        OutputFormat::Text => {
            println!();
            println!(
                "Mapped {} switches and {} access points behind {}: {} links",
                topology.count(DeviceClass::Switch),
                topology.count(DeviceClass::AccessPoint),
                hostname,
                topology.links.len()
            );
            for warning in &topology.warnings {
                println!("  warning: {}", warning);
            }
            println!("File saved: {}", path.display());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "output": path.display().to_string(),
                    "generated_at": chrono::Utc::now().to_rfc3339(),
                    "gateway": topology.gateway(),
                    "devices": topology.devices,
                    "links": topology.links,
                    "warnings": topology.warnings,
                })
            );
        }
    }

    Ok(())
}

async fn cmd_firewalls(cli: &Cli, connection: ConnectionArgs) -> Result<()> {
    let mut overrides = connection.into_overrides();
    overrides.mode = Some(ConnectionMode::Manager);
    let config = config::load_connection_config(overrides)?;

    let client = ManagerClient::new(&config)?;
    let firewalls = client
        .list_firewalls()
        .await
        .context("Failed to load device list")?;

    match cli.format {
        OutputFormat::Text => {
            if firewalls.is_empty() {
                println!("No devices found.");
            }
            for fw in &firewalls {
                println!("  {}", fw.label());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "firewalls": firewalls }));
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config_path = config::get_config_file_path_string();
    let options = config::load_topology_options();
    let connection = config::load_connection_config(ConnectionSection::default());

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            match &connection {
                Ok(c) => {
                    println!("Mode:             {}", c.mode);
                    println!("Endpoint:         {} (from {})", c.base_url(), c.source);
                    println!("Verify TLS:       {}", c.verify_tls);
                    println!("Timeout:          {}s", c.timeout.as_secs());
                }
                Err(e) => println!("Connection:       not configured ({})", e),
            }
            println!("Collisions:       {}", options.collision_policy);
            println!();
            println!("Environment variables:");
            println!("  FORTITOPO_HOST, FORTITOPO_PORT, FORTITOPO_TOKEN, FORTITOPO_MODE");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            let connection = connection.ok().map(|c| {
                serde_json::json!({
                    "mode": c.mode,
                    "endpoint": c.base_url(),
                    "source": c.source.to_string(),
                    "verify_tls": c.verify_tls,
                    "timeout_secs": c.timeout.as_secs(),
                })
            });
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "connection": connection,
                    "collision_policy": options.collision_policy,
                })
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_map_command() {
        let cli = Cli::try_parse_from([
            "fortitopo", "map", "--mode", "fmg", "--host", "10.0.0.1", "--firewall", "hq-fw",
            "--output", "hq.drawio", "--keep-last",
        ])
        .unwrap();

        match cli.command {
            Commands::Map { connection, diagram, firewall, save_snapshot } => {
                assert_eq!(connection.mode, Some(ConnectionMode::Manager));
                assert_eq!(firewall.as_deref(), Some("hq-fw"));
                assert_eq!(diagram.output, Some(PathBuf::from("hq.drawio")));
                assert!(diagram.keep_last);
                assert!(save_snapshot.is_none());

                let overrides = connection.into_overrides();
                assert_eq!(overrides.host.as_deref(), Some("10.0.0.1"));
                assert_eq!(overrides.verify_tls, None);
            }
            _ => panic!("expected map command"),
        }
    }

    #[test]
    fn test_parse_render_command() {
        let cli = Cli::try_parse_from(["fortitopo", "--format", "json", "render", "inventory.json"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Render { .. }));
    }
}
