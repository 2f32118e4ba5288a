//! FortiTopology Core Library
//!
//! This crate provides the core functionality for FortiTopology:
//! - Record acquisition from a FortiGate or through a FortiManager proxy
//! - Topology reconstruction (device catalog, neighbor resolution, link dedup)
//! - draw.io document serialization
//!
//! # Example
//!
//! ```no_run
//! use fortitopo_core::{config, source, topology};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let connection = config::load_connection_config(Default::default())?;
//!     let source = source::RecordSource::connect(&connection, None).await?;
//!     let inventory = source.fetch_inventory().await?;
//!
//!     let topology = topology::build_topology(&inventory, config::load_topology_options());
//!     let path = topology::default_output_name(&topology.gateway().unwrap().display_name);
//!     topology::write_document(&path, &topology.to_drawio()?)?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod records;
pub mod source;
pub mod topology;

// Re-export commonly used types
pub use config::{ConfigSource, ConnectionConfig, ConnectionMode};
pub use error::TopologyError;
pub use records::{AccessPointRecord, GatewayRecord, Inventory, SwitchRecord};
pub use source::{ManagedFirewall, ManagerClient, RecordSource, SourceError};
pub use topology::{
    BuildProgress, BuildStage, CollisionPolicy, Device, DeviceClass, ProgressCallback, Topology,
    TopologyOptions,
};
