//! Record acquisition.
//!
//! Fetches the gateway identity, managed switches and managed access points
//! either straight from a FortiGate or relayed through a FortiManager, and
//! hands them to the topology engine as a normalized [`Inventory`].

mod envelope;
mod gateway;
mod manager;

pub use envelope::{unwrap_records, ResponseEnvelope};
pub use gateway::GatewayClient;
pub use manager::{ManagedFirewall, ManagerClient};

use crate::config::{ConnectionConfig, ConnectionMode};
use crate::records::{GatewayRecord, Inventory};
use serde_json::Value;

pub(crate) const LICENSE_STATUS_ENDPOINT: &str = "/monitor/license/status";
pub(crate) const SYSTEM_STATUS_ENDPOINT: &str = "/monitor/system/status";
pub const MANAGED_SWITCH_ENDPOINT: &str = "/cmdb/switch-controller/managed-switch";
pub const MANAGED_AP_ENDPOINT: &str = "/monitor/wifi/managed_ap/select";

/// Errors talking to a FortiGate or FortiManager.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("FortiManager RPC error: {message} (code {code})")]
    Rpc { code: i64, message: String },

    #[error("FortiManager returned an empty response")]
    EmptyResponse,

    #[error("no proxy target form for {firewall} answered {endpoint}")]
    ProxyFailed { firewall: String, endpoint: String },

    #[error("firewall '{0}' is not managed by this FortiManager")]
    FirewallNotFound(String),

    #[error("{0} firewalls are managed by this FortiManager; select one with --firewall")]
    FirewallNotSelected(usize),
}

pub(crate) fn http_client(config: &ConnectionConfig) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(SourceError::Client)
}

/// Where records come from for one run.
#[derive(Debug, Clone)]
pub enum RecordSource {
    Direct(GatewayClient),
    Manager {
        client: ManagerClient,
        firewall: ManagedFirewall,
    },
}

impl RecordSource {
    /// Connect according to `config`. In manager mode `firewall` selects the
    /// target by hostname, serial or label; it may be omitted when the
    /// manager has exactly one firewall.
    pub async fn connect(config: &ConnectionConfig, firewall: Option<&str>) -> Result<Self, SourceError> {
        match config.mode {
            ConnectionMode::Direct => Ok(RecordSource::Direct(GatewayClient::new(config)?)),
            ConnectionMode::Manager => {
                let client = ManagerClient::new(config)?;
                let firewalls = client.list_firewalls().await?;
                let firewall = select_firewall(firewalls, firewall)?;
                tracing::info!("Target: {} (ADOM: {})", firewall.name, firewall.adom);
                Ok(RecordSource::Manager { client, firewall })
            }
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        match self {
            RecordSource::Direct(_) => ConnectionMode::Direct,
            RecordSource::Manager { .. } => ConnectionMode::Manager,
        }
    }

    async fn get(&self, endpoint: &str) -> Result<Value, SourceError> {
        match self {
            RecordSource::Direct(client) => client.get(endpoint).await,
            RecordSource::Manager { client, firewall } => client.proxy_get(firewall, endpoint).await,
        }
    }

    /// Gateway identity. In manager mode the selection already carries it.
    pub async fn gateway_record(&self) -> GatewayRecord {
        match self {
            RecordSource::Direct(client) => client.gateway_record().await,
            RecordSource::Manager { firewall, .. } => GatewayRecord {
                serial: Some(firewall.serial.clone()),
                hostname: Some(firewall.name.clone()),
            },
        }
    }

    /// Fetch everything the topology engine needs.
    pub async fn fetch_inventory(&self) -> Result<Inventory, SourceError> {
        let gateway = self.gateway_record().await;
        tracing::info!(
            "Target: {} ({})",
            gateway.hostname.as_deref().unwrap_or("-"),
            gateway.serial.as_deref().unwrap_or("-")
        );

        tracing::info!("Loading switches and access points");
        let (switches, access_points) = tokio::try_join!(
            self.get(MANAGED_SWITCH_ENDPOINT),
            self.get(MANAGED_AP_ENDPOINT)
        )?;

        let mode = self.mode();
        let switches = unwrap_records(mode, "switches", switches);
        let access_points = unwrap_records(mode, "access points", access_points);

        Ok(Inventory::from_values(gateway, &switches, &access_points))
    }
}

fn select_firewall(
    firewalls: Vec<ManagedFirewall>,
    selector: Option<&str>,
) -> Result<ManagedFirewall, SourceError> {
    match selector {
        Some(selector) => firewalls
            .into_iter()
            .find(|fw| fw.matches(selector))
            .ok_or_else(|| SourceError::FirewallNotFound(selector.to_string())),
        None => {
            let count = firewalls.len();
            let mut firewalls = firewalls.into_iter();
            match (firewalls.next(), firewalls.next()) {
                (Some(only), None) => Ok(only),
                _ => Err(SourceError::FirewallNotSelected(count)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fw(name: &str, serial: &str) -> ManagedFirewall {
        ManagedFirewall {
            name: name.to_string(),
            serial: serial.to_string(),
            adom: "root".to_string(),
            oid: None,
        }
    }

    #[test]
    fn test_select_by_name_or_serial() {
        let list = vec![fw("hq-fw", "FGT1"), fw("branch-fw", "FGT2")];
        assert_eq!(select_firewall(list.clone(), Some("branch-fw")).unwrap().serial, "FGT2");
        assert_eq!(select_firewall(list, Some("FGT1")).unwrap().name, "hq-fw");
    }

    #[test]
    fn test_select_single_firewall_implicitly() {
        assert_eq!(select_firewall(vec![fw("hq-fw", "FGT1")], None).unwrap().name, "hq-fw");
    }

    #[test]
    fn test_select_errors() {
        let list = vec![fw("hq-fw", "FGT1"), fw("branch-fw", "FGT2")];
        assert!(matches!(
            select_firewall(list.clone(), None),
            Err(SourceError::FirewallNotSelected(2))
        ));
        assert!(matches!(
            select_firewall(list, Some("nope")),
            Err(SourceError::FirewallNotFound(_))
        ));
    }
}
