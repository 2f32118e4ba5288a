//! Inventory snapshots.
//!
//! A snapshot is the JSON form of one run's [`Inventory`]. Saving it next to
//! the diagram lets a topology be re-rendered later without access to the
//! firewall.

use anyhow::{Context, Result};
use fortitopo_core::Inventory;
use std::fs;
use std::path::Path;

/// Load an inventory snapshot from `path`
pub fn load_snapshot(path: &Path) -> Result<Inventory> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let inventory: Inventory = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    tracing::debug!(
        "Loaded snapshot {}: {} switches, {} access points",
        path.display(),
        inventory.switches.len(),
        inventory.access_points.len()
    );
    Ok(inventory)
}

/// Save an inventory snapshot to `path`
pub fn save_snapshot(path: &Path, inventory: &Inventory) -> Result<()> {
    let json = serde_json::to_vec_pretty(inventory).context("Failed to serialize snapshot")?;
    fortitopo_core::topology::write_document(path, &json)
        .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
    Ok(())
}
