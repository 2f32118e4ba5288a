//! Topology reconstruction.
//!
//! Turns one run's [`Inventory`] into a deduplicated device graph and
//! serializes it as a draw.io document:
//! - catalog: one device per record plus the alias index
//! - links: neighbor references resolved through the index
//! - dedup: one link per unordered device pair
//! - drawio: fixed-row layout and XML output
//!
//! The whole pipeline is synchronous and touches no global state.

pub mod catalog;
mod dedup;
pub mod drawio;
pub mod identity;
pub mod links;
mod output;

pub use catalog::{Catalog, CollisionPolicy, Device, DeviceClass, NameIndex, TopologyWarning};
pub use dedup::dedup_links;
pub use drawio::render_drawio;
pub use identity::normalize;
pub use links::{resolve_links, CandidateLink};
pub use output::{default_output_name, write_document, DIAGRAM_EXTENSION};

use crate::error::Result;
use crate::records::Inventory;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Knobs for one topology build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyOptions {
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Result of a topology build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    pub devices: Vec<Device>,
    pub links: Vec<CandidateLink>,
    pub warnings: Vec<TopologyWarning>,
}

impl Topology {
    /// The gateway descriptor (always the first device).
    pub fn gateway(&self) -> Option<&Device> {
        self.devices.iter().find(|d| d.class == DeviceClass::Gateway)
    }

    pub fn count(&self, class: DeviceClass) -> usize {
        self.devices.iter().filter(|d| d.class == class).count()
    }

    /// Serialize to a `.drawio` document.
    pub fn to_drawio(&self) -> Result<Vec<u8>> {
        render_drawio(&self.devices, &self.links)
    }
}

/// Progress updates during a topology build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProgress {
    pub stage: BuildStage,
    pub message: String,
    pub elapsed_secs: f64,
}

/// Stages of the topology build
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Cataloging,
    ResolvingLinks,
    Deduplicating,
    Complete,
}

/// Callback type for build progress updates
pub type ProgressCallback = Box<dyn Fn(BuildProgress) + Send + Sync>;

/// Build the topology graph for an inventory.
pub fn build_topology(inventory: &Inventory, options: TopologyOptions) -> Topology {
    build_topology_with_progress(inventory, options, None)
}

/// Build the topology graph, reporting each stage to `on_progress`.
pub fn build_topology_with_progress(
    inventory: &Inventory,
    options: TopologyOptions,
    on_progress: Option<ProgressCallback>,
) -> Topology {
    let start = Instant::now();
    let emit_progress = |stage: BuildStage, message: &str| {
        tracing::info!("[Topology] {}", message);
        if let Some(ref callback) = on_progress {
            callback(BuildProgress {
                stage,
                message: message.to_string(),
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
        }
    };

    emit_progress(
        BuildStage::Cataloging,
        &format!(
            "Cataloging 1 gateway, {} switches, {} access points...",
            inventory.switches.len(),
            inventory.access_points.len()
        ),
    );
    let catalog = Catalog::build(inventory, options.collision_policy);
    for warning in &catalog.warnings {
        emit_progress(BuildStage::Cataloging, &format!("Warning: {}", warning));
    }

    emit_progress(BuildStage::ResolvingLinks, "Resolving neighbor links...");
    let candidates = resolve_links(inventory, &catalog);

    emit_progress(
        BuildStage::Deduplicating,
        &format!("Deduplicating {} candidate links...", candidates.len()),
    );
    let links = dedup_links(candidates);

    emit_progress(
        BuildStage::Complete,
        &format!(
            "Topology complete: {} devices, {} links",
            catalog.devices.len(),
            links.len()
        ),
    );

    Topology {
        devices: catalog.devices,
        links,
        warnings: catalog.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{GatewayRecord, SourceRecord, SwitchPort, SwitchRecord};
    use std::sync::{Arc, Mutex};

    fn inventory() -> Inventory {
        Inventory {
            gateway: GatewayRecord {
                serial: Some("FGT001".to_string()),
                hostname: Some("hq-fw".to_string()),
            },
            switches: vec![
                SourceRecord {
                    ordinal: 0,
                    record: SwitchRecord {
                        switch_id: Some("S1".to_string()),
                        name: Some("Sw-A".to_string()),
                        ports: vec![SwitchPort {
                            port_name: Some("port49".to_string()),
                            fgt_peer_device_name: Some("hq-fw".to_string()),
                            fgt_peer_port_name: Some("fortilink".to_string()),
                            ..Default::default()
                        }],
                    },
                },
            ],
            access_points: Vec::new(),
        }
    }

    #[test]
    fn test_build_topology() {
        let topology = build_topology(&inventory(), TopologyOptions::default());

        assert_eq!(topology.devices.len(), 2);
        assert_eq!(topology.gateway().unwrap().identity, "FGT001");
        assert_eq!(topology.count(DeviceClass::Switch), 1);
        assert_eq!(topology.links.len(), 1);
        assert_eq!(topology.links[0].from, "FGT001");
        assert!(topology.warnings.is_empty());
    }

    #[test]
    fn test_progress_callback_sees_every_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let callback: ProgressCallback = Box::new(move |progress: BuildProgress| {
            sink.lock().unwrap().push(progress.stage);
        });

        build_topology_with_progress(&inventory(), TopologyOptions::default(), Some(callback));

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                BuildStage::Cataloging,
                BuildStage::ResolvingLinks,
                BuildStage::Deduplicating,
                BuildStage::Complete,
            ]
        );
    }
}
