//! Link resolution.
//!
//! Switches report their neighbors per port (an ISL peer switch or, failing
//! that, a FortiLink peer gateway). Access points report what LLDP saw on
//! their uplink, with the controller's "connected switch" hint as a backup
//! because LLDP frames rarely survive intermediate unmanaged hardware.

use super::catalog::Catalog;
use super::identity::normalize;
use crate::records::{AccessPointRecord, Inventory, SwitchRecord};
use serde::{Deserialize, Serialize};

/// Peer port label used when an AP link comes from the static switch hint.
pub const UNKNOWN_PEER_PORT: &str = "?";

/// Local port label used when an AP link comes from the static switch hint.
pub const AP_UPLINK_PLACEHOLDER: &str = "eth0";

/// One connection inferred from a single port or neighbor record.
///
/// Directed as discovered (peer → reporting device) but treated as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub from: String,
    pub to: String,
    pub from_port: Option<String>,
    pub to_port: Option<String>,
}

impl CandidateLink {
    /// Unordered endpoint pair, used to collapse both directions of a link.
    pub fn endpoint_key(&self) -> (&str, &str) {
        if self.from <= self.to {
            (self.from.as_str(), self.to.as_str())
        } else {
            (self.to.as_str(), self.from.as_str())
        }
    }
}

/// Resolve every port and neighbor record into candidate links.
///
/// Switch links come first, then access point links; within each, record
/// order then port order. Unresolvable neighbors are dropped.
pub fn resolve_links(inventory: &Inventory, catalog: &Catalog) -> Vec<CandidateLink> {
    let mut links = Vec::new();

    for (entry, identity) in inventory.switches.iter().zip(&catalog.switch_identities) {
        resolve_switch_ports(&entry.record, identity, catalog, &mut links);
    }
    let switch_links = links.len();
    tracing::info!("Switch connections found: {}", switch_links);

    for (entry, identity) in inventory
        .access_points
        .iter()
        .zip(&catalog.access_point_identities)
    {
        if let Some(link) = resolve_access_point(&entry.record, identity, catalog) {
            links.push(link);
        }
    }
    tracing::info!("Access point connections found: {}", links.len() - switch_links);

    links
}

fn resolve_switch_ports(
    record: &SwitchRecord,
    identity: &str,
    catalog: &Catalog,
    links: &mut Vec<CandidateLink>,
) {
    for port in &record.ports {
        let (peer_name, peer_port) = if let Some(name) = non_blank(&port.isl_peer_device_name) {
            (name, &port.isl_peer_port_name)
        } else if let Some(name) = non_blank(&port.fgt_peer_device_name) {
            (name, &port.fgt_peer_port_name)
        } else {
            continue;
        };

        match catalog.index.resolve(peer_name) {
            Some(peer) => links.push(CandidateLink {
                from: peer.to_string(),
                to: identity.to_string(),
                from_port: peer_port.clone(),
                to_port: port.port_name.clone(),
            }),
            None => tracing::debug!(
                "Switch {}: peer '{}' on {} is not a known device",
                identity,
                peer_name,
                port.port_name.as_deref().unwrap_or("?")
            ),
        }
    }
}

fn resolve_access_point(
    record: &AccessPointRecord,
    identity: &str,
    catalog: &Catalog,
) -> Option<CandidateLink> {
    if let Some(neighbor) = record.lldp.first() {
        if let Some(system_name) = non_blank(&neighbor.system_name) {
            match catalog.index.resolve(system_name) {
                Some(peer) => {
                    return Some(CandidateLink {
                        from: peer.to_string(),
                        to: identity.to_string(),
                        from_port: neighbor.port_id.clone(),
                        to_port: neighbor.local_port.clone(),
                    });
                }
                None => tracing::debug!(
                    "AP {}: LLDP neighbor '{}' is not a known device",
                    identity,
                    system_name
                ),
            }
        }
    }

    let hinted = non_blank(&record.connected_switch_serial)?;
    let peer = normalize(Some(hinted));
    if !catalog.contains_identity(&peer) {
        tracing::debug!("AP {}: connected switch '{}' is not a known device", identity, hinted);
        return None;
    }

    Some(CandidateLink {
        from: peer,
        to: identity.to_string(),
        from_port: Some(UNKNOWN_PEER_PORT.to_string()),
        to_port: Some(AP_UPLINK_PLACEHOLDER.to_string()),
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{GatewayRecord, LldpNeighbor, SourceRecord, SwitchPort};
    use crate::topology::catalog::CollisionPolicy;

    fn port(local: &str, isl: Option<(&str, &str)>, fgt: Option<(&str, &str)>) -> SwitchPort {
        SwitchPort {
            port_name: Some(local.to_string()),
            isl_peer_device_name: isl.map(|(n, _)| n.to_string()),
            isl_peer_port_name: isl.map(|(_, p)| p.to_string()),
            fgt_peer_device_name: fgt.map(|(n, _)| n.to_string()),
            fgt_peer_port_name: fgt.map(|(_, p)| p.to_string()),
        }
    }

    fn build(switches: Vec<SwitchRecord>, aps: Vec<AccessPointRecord>) -> Vec<CandidateLink> {
        let inventory = Inventory {
            gateway: GatewayRecord {
                serial: Some("FGT001".to_string()),
                hostname: Some("hq-fw".to_string()),
            },
            switches: switches
                .into_iter()
                .enumerate()
                .map(|(ordinal, record)| SourceRecord { ordinal, record })
                .collect(),
            access_points: aps
                .into_iter()
                .enumerate()
                .map(|(ordinal, record)| SourceRecord { ordinal, record })
                .collect(),
        };
        let catalog = Catalog::build(&inventory, CollisionPolicy::KeepFirst);
        resolve_links(&inventory, &catalog)
    }

    fn switch(id: &str, name: &str, ports: Vec<SwitchPort>) -> SwitchRecord {
        SwitchRecord {
            switch_id: Some(id.to_string()),
            name: Some(name.to_string()),
            ports,
        }
    }

    fn link(from: &str, to: &str, from_port: &str, to_port: &str) -> CandidateLink {
        CandidateLink {
            from: from.to_string(),
            to: to.to_string(),
            from_port: Some(from_port.to_string()),
            to_port: Some(to_port.to_string()),
        }
    }

    #[test]
    fn test_isl_peer_resolved_by_name() {
        let links = build(
            vec![
                switch("S1", "Sw-A", vec![port("p1", Some(("Sw-B", "p2")), None)]),
                switch("S2", "Sw-B", vec![]),
            ],
            vec![],
        );
        assert_eq!(links, vec![link("S2", "S1", "p2", "p1")]);
    }

    #[test]
    fn test_fortilink_peer_resolved_through_gateway_aliases() {
        let links = build(
            vec![
                switch("S1", "Sw-A", vec![port("port49", None, Some(("hq-fw", "fortilink")))]),
                switch("S2", "Sw-B", vec![port("port50", None, Some(("FortiGate", "a")))]),
            ],
            vec![],
        );
        assert_eq!(
            links,
            vec![
                link("FGT001", "S1", "fortilink", "port49"),
                link("FGT001", "S2", "a", "port50"),
            ]
        );
    }

    #[test]
    fn test_isl_peer_takes_precedence_over_fortilink_peer() {
        let links = build(
            vec![
                switch("S1", "Sw-A", vec![port("p1", Some(("Sw-B", "p9")), Some(("hq-fw", "x")))]),
                switch("S2", "Sw-B", vec![]),
            ],
            vec![],
        );
        assert_eq!(links, vec![link("S2", "S1", "p9", "p1")]);
    }

    #[test]
    fn test_unresolved_peer_dropped() {
        let links = build(
            vec![switch("S1", "Sw-A", vec![
                port("p1", Some(("ghost", "p2")), None),
                port("p2", None, None),
                port("p3", None, Some(("other-fw", "x"))),
            ])],
            vec![],
        );
        assert!(links.is_empty());
    }

    #[test]
    fn test_ap_lldp_neighbor() {
        let ap = AccessPointRecord {
            serial: Some("FP231F1".to_string()),
            name: Some("Lobby".to_string()),
            lldp: vec![
                LldpNeighbor {
                    system_name: Some("Sw-A".to_string()),
                    port_id: Some("port5".to_string()),
                    local_port: Some("lan1".to_string()),
                },
                LldpNeighbor {
                    system_name: Some("Sw-B".to_string()),
                    port_id: Some("port6".to_string()),
                    local_port: Some("lan2".to_string()),
                },
            ],
            connected_switch_serial: Some("S2".to_string()),
        };
        let links = build(
            vec![switch("S1", "Sw-A", vec![]), switch("S2", "Sw-B", vec![])],
            vec![ap],
        );
        assert_eq!(links, vec![link("S1", "FP231F1", "port5", "lan1")]);
    }

    #[test]
    fn test_ap_falls_back_to_connected_switch() {
        let no_lldp = AccessPointRecord {
            serial: Some("FP1".to_string()),
            connected_switch_serial: Some("S1".to_string()),
            ..Default::default()
        };
        let unknown_lldp = AccessPointRecord {
            serial: Some("FP2".to_string()),
            lldp: vec![LldpNeighbor {
                system_name: Some("unmanaged-hub".to_string()),
                ..Default::default()
            }],
            connected_switch_serial: Some("S1".to_string()),
            ..Default::default()
        };
        let blank_lldp = AccessPointRecord {
            serial: Some("FP3".to_string()),
            lldp: vec![LldpNeighbor {
                system_name: Some("   ".to_string()),
                port_id: Some("port9".to_string()),
                ..Default::default()
            }],
            connected_switch_serial: Some("S1".to_string()),
            ..Default::default()
        };
        let nameless_lldp = AccessPointRecord {
            serial: Some("FP4".to_string()),
            lldp: vec![LldpNeighbor {
                port_id: Some("port10".to_string()),
                local_port: Some("lan1".to_string()),
                ..Default::default()
            }],
            connected_switch_serial: Some("S1".to_string()),
            ..Default::default()
        };
        let links = build(
            vec![switch("S1", "Sw-A", vec![])],
            vec![no_lldp, unknown_lldp, blank_lldp, nameless_lldp],
        );
        assert_eq!(
            links,
            vec![
                link("S1", "FP1", UNKNOWN_PEER_PORT, AP_UPLINK_PLACEHOLDER),
                link("S1", "FP2", UNKNOWN_PEER_PORT, AP_UPLINK_PLACEHOLDER),
                link("S1", "FP3", UNKNOWN_PEER_PORT, AP_UPLINK_PLACEHOLDER),
                link("S1", "FP4", UNKNOWN_PEER_PORT, AP_UPLINK_PLACEHOLDER),
            ]
        );
    }

    #[test]
    fn test_ap_hint_must_be_known_identity() {
        let ap = AccessPointRecord {
            serial: Some("FP1".to_string()),
            connected_switch_serial: Some("S404".to_string()),
            ..Default::default()
        };
        let links = build(vec![switch("S1", "Sw-A", vec![])], vec![ap]);
        assert!(links.is_empty());
    }

    #[test]
    fn test_switch_links_precede_ap_links() {
        let ap = AccessPointRecord {
            serial: Some("FP1".to_string()),
            connected_switch_serial: Some("S1".to_string()),
            ..Default::default()
        };
        let links = build(
            vec![switch("S1", "Sw-A", vec![port("p49", None, Some(("hq-fw", "x")))])],
            vec![ap],
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].to, "S1");
        assert_eq!(links[1].to, "FP1");
    }

    #[test]
    fn test_endpoint_key_is_unordered() {
        let a = link("S1", "S2", "p1", "p2");
        let b = link("S2", "S1", "p2", "p1");
        assert_eq!(a.endpoint_key(), b.endpoint_key());
        assert_eq!(a.endpoint_key(), ("S1", "S2"));
    }
}
