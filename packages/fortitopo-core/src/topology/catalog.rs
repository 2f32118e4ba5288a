//! Device catalog and name index.
//!
//! Every record becomes one [`Device`]; every name a device is known by
//! (hostname, serial, sanitized identity and, for the gateway, the generic
//! product name) is registered in the [`NameIndex`] so the link resolver can
//! map neighbor references back to a node.

use super::identity::normalize;
use crate::records::{AccessPointRecord, Inventory, SourceRecord, SwitchRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serial used when the firewall did not report one.
pub const GATEWAY_SERIAL_FALLBACK: &str = "FG-UNKNOWN";

/// Hostname used when the firewall did not report one.
pub const GATEWAY_HOSTNAME_FALLBACK: &str = "MyFortiGate";

/// Generic product name switches and APs sometimes report instead of the hostname.
pub const GATEWAY_GENERIC_ALIAS: &str = "FortiGate";

/// Kind of device, which decides placement row and drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Gateway,
    Switch,
    AccessPoint,
}

impl DeviceClass {
    /// Short tag used in placeholder serials (`Unknown_SW_3`).
    pub fn placeholder_tag(self) -> &'static str {
        match self {
            DeviceClass::Gateway => "FG",
            DeviceClass::Switch => "SW",
            DeviceClass::AccessPoint => "AP",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Gateway => write!(f, "gateway"),
            DeviceClass::Switch => write!(f, "switch"),
            DeviceClass::AccessPoint => write!(f, "access point"),
        }
    }
}

/// One discovered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Sanitized serial, unique within a topology
    pub identity: String,
    pub display_name: String,
    pub serial: String,
    pub class: DeviceClass,
}

/// What to do when two devices (or two aliases) land on the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep the entry registered first and report the later one
    #[default]
    KeepFirst,
    /// Let the later entry replace the earlier one
    LastWriteWins,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::KeepFirst => write!(f, "keep first"),
            CollisionPolicy::LastWriteWins => write!(f, "last write wins"),
        }
    }
}

/// Non-fatal problems found while building the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyWarning {
    /// An alias already pointed at a different device
    AliasCollision {
        alias: String,
        kept: String,
        discarded: String,
    },
    /// Two serials normalized to the same identity
    IdentityCollision {
        identity: String,
        kept_serial: String,
        discarded_serial: String,
    },
}

impl std::fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyWarning::AliasCollision { alias, kept, discarded } => write!(
                f,
                "alias '{}' is claimed by both {} and {}; using {}",
                alias, kept, discarded, kept
            ),
            TopologyWarning::IdentityCollision {
                identity,
                kept_serial,
                discarded_serial,
            } => write!(
                f,
                "serials '{}' and '{}' both map to node '{}'; using '{}'",
                kept_serial, discarded_serial, identity, kept_serial
            ),
        }
    }
}

/// Alias → canonical identity lookup table.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    aliases: HashMap<String, String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `alias` at `identity`. Blank aliases are ignored.
    ///
    /// Returns a warning when the alias already resolved to a different identity.
    pub fn register(
        &mut self,
        alias: &str,
        identity: &str,
        policy: CollisionPolicy,
    ) -> Option<TopologyWarning> {
        if alias.trim().is_empty() {
            return None;
        }

        match self.aliases.get(alias) {
            Some(existing) if existing == identity => None,
            Some(existing) => {
                let (kept, discarded) = match policy {
                    CollisionPolicy::KeepFirst => (existing.clone(), identity.to_string()),
                    CollisionPolicy::LastWriteWins => (identity.to_string(), existing.clone()),
                };
                self.aliases.insert(alias.to_string(), kept.clone());
                Some(TopologyWarning::AliasCollision {
                    alias: alias.to_string(),
                    kept,
                    discarded,
                })
            }
            None => {
                self.aliases.insert(alias.to_string(), identity.to_string());
                None
            }
        }
    }

    /// Best-effort lookup; `None` means "no link", never an error.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Devices of one run, plus the index used to resolve neighbor references.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub devices: Vec<Device>,
    pub index: NameIndex,
    pub warnings: Vec<TopologyWarning>,
    /// Identity of each `Inventory::switches` entry, in the same order
    pub switch_identities: Vec<String>,
    /// Identity of each `Inventory::access_points` entry, in the same order
    pub access_point_identities: Vec<String>,
    positions: HashMap<String, usize>,
    policy: CollisionPolicy,
}

impl Catalog {
    /// Build the catalog: gateway first, then switches, then access points.
    pub fn build(inventory: &Inventory, policy: CollisionPolicy) -> Self {
        let mut catalog = Catalog {
            policy,
            ..Default::default()
        };

        let serial = non_blank(inventory.gateway.serial.as_deref())
            .unwrap_or(GATEWAY_SERIAL_FALLBACK)
            .to_string();
        let hostname = non_blank(inventory.gateway.hostname.as_deref())
            .unwrap_or(GATEWAY_HOSTNAME_FALLBACK)
            .to_string();
        tracing::info!("Gateway: {} ({})", hostname, serial);
        let identity = catalog.add(DeviceClass::Gateway, serial, hostname);
        catalog.register(GATEWAY_GENERIC_ALIAS, &identity);

        for SourceRecord { ordinal, record } in &inventory.switches {
            let identity = catalog.add_switch(*ordinal, record);
            catalog.switch_identities.push(identity);
        }

        for SourceRecord { ordinal, record } in &inventory.access_points {
            let identity = catalog.add_access_point(*ordinal, record);
            catalog.access_point_identities.push(identity);
        }

        tracing::info!(
            "Created mappings. {} devices found, {} aliases",
            catalog.devices.len(),
            catalog.index.len()
        );
        catalog
    }

    /// Whether a node with this identity is in the catalog.
    pub fn contains_identity(&self, identity: &str) -> bool {
        self.positions.contains_key(identity)
    }

    pub fn device(&self, identity: &str) -> Option<&Device> {
        self.positions.get(identity).map(|&i| &self.devices[i])
    }

    fn add_switch(&mut self, ordinal: usize, record: &SwitchRecord) -> String {
        let serial = serial_or_placeholder(record.switch_id.as_deref(), DeviceClass::Switch, ordinal);
        let name = non_blank(record.name.as_deref()).unwrap_or(&serial).to_string();
        tracing::info!("Switch: {} ({})", serial, name);
        self.add(DeviceClass::Switch, serial, name)
    }

    fn add_access_point(&mut self, ordinal: usize, record: &AccessPointRecord) -> String {
        let serial = serial_or_placeholder(record.serial.as_deref(), DeviceClass::AccessPoint, ordinal);
        let name = non_blank(record.name.as_deref()).unwrap_or(&serial).to_string();
        tracing::info!("Access point: {} ({})", serial, name);
        self.add(DeviceClass::AccessPoint, serial, name)
    }

    /// Append a device and register its name, serial and identity as aliases.
    fn add(&mut self, class: DeviceClass, serial: String, display_name: String) -> String {
        let identity = normalize(Some(serial.as_str()));

        match self.positions.get(&identity) {
            Some(&pos) => {
                let existing = &self.devices[pos];
                let warning = match self.policy {
                    CollisionPolicy::KeepFirst => TopologyWarning::IdentityCollision {
                        identity: identity.clone(),
                        kept_serial: existing.serial.clone(),
                        discarded_serial: serial.clone(),
                    },
                    CollisionPolicy::LastWriteWins => TopologyWarning::IdentityCollision {
                        identity: identity.clone(),
                        kept_serial: serial.clone(),
                        discarded_serial: existing.serial.clone(),
                    },
                };
                if self.policy == CollisionPolicy::LastWriteWins {
                    self.devices[pos] = Device {
                        identity: identity.clone(),
                        display_name: display_name.clone(),
                        serial: serial.clone(),
                        class,
                    };
                }
                self.warn(warning);
            }
            None => {
                self.positions.insert(identity.clone(), self.devices.len());
                self.devices.push(Device {
                    identity: identity.clone(),
                    display_name: display_name.clone(),
                    serial: serial.clone(),
                    class,
                });
            }
        }

        self.register(&display_name, &identity);
        self.register(&serial, &identity);
        self.register(&identity, &identity);
        identity
    }

    fn register(&mut self, alias: &str, identity: &str) {
        if let Some(warning) = self.index.register(alias, identity, self.policy) {
            self.warn(warning);
        }
    }

    fn warn(&mut self, warning: TopologyWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn serial_or_placeholder(serial: Option<&str>, class: DeviceClass, ordinal: usize) -> String {
    non_blank(serial)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown_{}_{}", class.placeholder_tag(), ordinal))
}
