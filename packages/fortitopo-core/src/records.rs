//! Typed views of the raw FortiOS records consumed by the topology engine.
//!
//! Field names follow the FortiOS REST API. Every field is optional: a
//! missing value is substituted with a fallback by the catalog builder, never
//! treated as an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Gateway identity as reported by the firewall (or by the manager's device list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayRecord {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Entry from `/cmdb/switch-controller/managed-switch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    #[serde(rename = "switch-id", default)]
    pub switch_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ports: Vec<SwitchPort>,
}

/// One row of a managed switch's port table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SwitchPort {
    #[serde(default)]
    pub port_name: Option<String>,
    /// Peer switch on an inter-switch link
    #[serde(default)]
    pub isl_peer_device_name: Option<String>,
    #[serde(default)]
    pub isl_peer_port_name: Option<String>,
    /// Peer FortiGate on a FortiLink uplink
    #[serde(default)]
    pub fgt_peer_device_name: Option<String>,
    #[serde(default)]
    pub fgt_peer_port_name: Option<String>,
}

/// Entry from `/monitor/wifi/managed_ap/select`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessPointRecord {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub lldp: Vec<LldpNeighbor>,
    #[serde(default)]
    pub connected_switch_serial: Option<String>,
}

/// LLDP neighbor seen by an access point on one of its uplinks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LldpNeighbor {
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub local_port: Option<String>,
}

/// A parsed record together with its position in the source collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord<T> {
    pub ordinal: usize,
    pub record: T,
}

/// Everything one topology run consumes.
///
/// Also the on-disk snapshot format used by `fortitopo render`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub gateway: GatewayRecord,
    #[serde(default)]
    pub switches: Vec<SourceRecord<SwitchRecord>>,
    #[serde(default)]
    pub access_points: Vec<SourceRecord<AccessPointRecord>>,
}

impl Inventory {
    /// Build an inventory from already-unwrapped record collections.
    pub fn from_values(gateway: GatewayRecord, switches: &[Value], access_points: &[Value]) -> Self {
        Self {
            gateway,
            switches: parse_records("switch", switches),
            access_points: parse_records("access point", access_points),
        }
    }
}

/// Parse a raw record collection, skipping entries that do not fit the record shape.
///
/// Ordinals are positions in `values`, so a skipped entry does not shift the
/// placeholder names of the records after it.
pub fn parse_records<T: DeserializeOwned>(kind: &str, values: &[Value]) -> Vec<SourceRecord<T>> {
    values
        .iter()
        .enumerate()
        .filter_map(|(ordinal, value)| {
            if !value.is_object() {
                tracing::warn!("Skipping {} record #{}: not an object", kind, ordinal);
                return None;
            }
            match serde_json::from_value::<T>(value.clone()) {
                Ok(record) => Some(SourceRecord { ordinal, record }),
                Err(e) => {
                    tracing::warn!("Skipping malformed {} record #{}: {}", kind, ordinal, e);
                    None
                }
            }
        })
        .collect()
}

/// Read a nested collection without letting it sink the record that owns it.
///
/// `null` or any non-list value reads as empty, and list items of the wrong
/// shape are skipped with a warning.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            tracing::warn!("Ignoring nested collection that is not a list: {}", other);
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed nested entry #{}: {}", index, e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_switch_record_field_names() {
        let sw: SwitchRecord = serde_json::from_value(json!({
            "switch-id": "S124EN0000000001",
            "name": "Core-SW",
            "ports": [{
                "port-name": "port24",
                "isl-peer-device-name": "Edge-SW",
                "isl-peer-port-name": "port1",
                "speed": "1000full"
            }]
        }))
        .unwrap();

        assert_eq!(sw.switch_id.as_deref(), Some("S124EN0000000001"));
        assert_eq!(sw.ports.len(), 1);
        assert_eq!(sw.ports[0].port_name.as_deref(), Some("port24"));
        assert_eq!(sw.ports[0].isl_peer_device_name.as_deref(), Some("Edge-SW"));
        assert_eq!(sw.ports[0].fgt_peer_device_name, None);
    }

    #[test]
    fn test_null_collections_read_as_empty() {
        let sw: SwitchRecord = serde_json::from_value(json!({"switch-id": "S1", "ports": null})).unwrap();
        assert!(sw.ports.is_empty());

        let ap: AccessPointRecord = serde_json::from_value(json!({"serial": "FP1", "lldp": null})).unwrap();
        assert!(ap.lldp.is_empty());
        assert_eq!(ap.connected_switch_serial, None);
    }

    #[test]
    fn test_non_list_collections_read_as_empty() {
        let sw: SwitchRecord =
            serde_json::from_value(json!({"switch-id": "S1", "name": "Sw-A", "ports": "bogus"})).unwrap();
        assert_eq!(sw.switch_id.as_deref(), Some("S1"));
        assert!(sw.ports.is_empty());

        let ap: AccessPointRecord = serde_json::from_value(json!({
            "serial": "FP1",
            "lldp": {"x": 1},
            "connected_switch_serial": "FGT001"
        }))
        .unwrap();
        assert!(ap.lldp.is_empty());
        assert_eq!(ap.connected_switch_serial.as_deref(), Some("FGT001"));
    }

    #[test]
    fn test_malformed_nested_entries_skipped() {
        let sw: SwitchRecord = serde_json::from_value(json!({
            "switch-id": "S1",
            "ports": [
                "port1",
                {"port-name": 7},
                {"port-name": "port2", "isl-peer-device-name": "Sw-B"}
            ]
        }))
        .unwrap();

        assert_eq!(sw.ports.len(), 1);
        assert_eq!(sw.ports[0].port_name.as_deref(), Some("port2"));
    }

    #[test]
    fn test_malformed_collections_keep_devices() {
        let inventory = Inventory::from_values(
            GatewayRecord::default(),
            &[json!({"switch-id": "S1", "name": "Sw-A", "ports": "bogus"})],
            &[json!({"serial": "FP1", "lldp": {"x": 1}, "connected_switch_serial": "FGT001"})],
        );

        assert_eq!(inventory.switches.len(), 1);
        assert_eq!(inventory.access_points.len(), 1);
        assert_eq!(inventory.access_points[0].record.serial.as_deref(), Some("FP1"));
    }

    #[test]
    fn test_parse_records_skips_malformed_entries() {
        let values = vec![
            json!({"switch-id": "S1"}),
            json!("not a record"),
            json!({"switch-id": 42}),
            json!({"name": "nameless"}),
        ];

        let parsed: Vec<SourceRecord<SwitchRecord>> = parse_records("switch", &values);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].ordinal, 0);
        assert_eq!(parsed[1].ordinal, 3);
        assert_eq!(parsed[1].record.name.as_deref(), Some("nameless"));
    }
}
