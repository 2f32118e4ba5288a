//! FortiManager JSON-RPC client.
//!
//! Besides listing the firewalls it manages, the manager can relay REST
//! calls to a firewall (`exec /sys/proxy/json`). Which form of the `target`
//! field a manager accepts depends on its version and ADOM layout, so the
//! known variants are tried in order until one returns data.

use super::SourceError;
use crate::config::ConnectionConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A FortiGate registered on the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFirewall {
    pub name: String,
    pub serial: String,
    pub adom: String,
    pub oid: Option<u64>,
}

impl ManagedFirewall {
    /// `"<name> (<serial>) [<adom>]"`
    pub fn label(&self) -> String {
        format!("{} ({}) [{}]", self.name, self.serial, self.adom)
    }

    /// Whether `selector` names this firewall by hostname, serial or label.
    pub fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        self.name == selector || self.serial == selector || self.label() == selector
    }
}

#[derive(Debug, Deserialize)]
struct DvmdbDevice {
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    sn: Option<String>,
    #[serde(default)]
    mgt_vdom: Option<String>,
    #[serde(default)]
    oid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Vec<RpcResult>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    #[serde(default)]
    status: RpcStatus,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default = "unknown_status")]
    code: i64,
    #[serde(default)]
    message: String,
}

/// A result without a status block is not a success.
impl Default for RpcStatus {
    fn default() -> Self {
        Self {
            code: unknown_status(),
            message: "missing status".to_string(),
        }
    }
}

fn unknown_status() -> i64 {
    -1
}

/// Client for the FortiManager JSON-RPC endpoint.
#[derive(Clone)]
pub struct ManagerClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl std::fmt::Debug for ManagerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl ManagerClient {
    pub fn new(config: &ConnectionConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: super::http_client(config)?,
            url: format!("{}/jsonrpc", config.base_url()),
            token: config.token.clone(),
        })
    }

    /// Issue one JSON-RPC call and return its `data` (`None` when the call
    /// succeeded without data).
    pub async fn call(&self, method: &str, url: &str, data: Value) -> Result<Option<Value>, SourceError> {
        let body = json!({
            "method": method,
            "params": [{"url": url, "data": data}],
            "id": 1,
        });

        tracing::debug!("JSON-RPC {} {}", method, url);
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: self.url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: resp.status(),
            });
        }

        let value = resp.json::<Value>().await.map_err(|source| SourceError::Http {
            url: self.url.clone(),
            source,
        })?;
        parse_rpc_response(value)
    }

    /// Firewalls known to the manager, sorted by label.
    pub async fn list_firewalls(&self) -> Result<Vec<ManagedFirewall>, SourceError> {
        tracing::info!("Loading device list");
        let data = self
            .call("get", "/dvmdb/device", json!({"option": "1"}))
            .await?
            .unwrap_or(Value::Null);

        let firewalls = parse_firewalls(&data);
        tracing::info!("{} devices loaded.", firewalls.len());
        Ok(firewalls)
    }

    /// Relay `GET /api/v2<endpoint>` to `firewall`.
    pub async fn proxy_get(&self, firewall: &ManagedFirewall, endpoint: &str) -> Result<Value, SourceError> {
        let resource = format!("/api/v2{}", endpoint);

        for target in target_variants(firewall) {
            tracing::debug!("Proxy target {}", target);
            let payload = json!({
                "target": [target],
                "action": "get",
                "resource": resource,
            });

            match self.call("exec", "/sys/proxy/json", payload).await {
                Ok(Some(data)) if !data.is_null() => return Ok(data),
                Ok(_) => tracing::debug!("Proxy target {} returned no data", target),
                Err(e) => tracing::debug!("Proxy target {} failed: {}", target, e),
            }
        }

        Err(SourceError::ProxyFailed {
            firewall: firewall.name.clone(),
            endpoint: endpoint.to_string(),
        })
    }
}

/// Unwrap `result[0]`, treating any non-zero status code as an error.
fn parse_rpc_response(value: Value) -> Result<Option<Value>, SourceError> {
    let resp: RpcResponse = serde_json::from_value(value).map_err(|_| SourceError::EmptyResponse)?;
    let first = resp.result.into_iter().next().ok_or(SourceError::EmptyResponse)?;

    if first.status.code != 0 {
        return Err(SourceError::Rpc {
            code: first.status.code,
            message: first.status.message,
        });
    }
    Ok(first.data)
}

/// Keep FortiGates (serial prefix `FG`) from a `/dvmdb/device` listing.
fn parse_firewalls(data: &Value) -> Vec<ManagedFirewall> {
    let Some(entries) = data.as_array() else {
        tracing::warn!("No devices found.");
        return Vec::new();
    };

    let mut firewalls: Vec<ManagedFirewall> = entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<DvmdbDevice>(entry.clone()).ok())
        .filter_map(|d| {
            let serial = d.sn.filter(|sn| sn.starts_with("FG"))?;
            Some(ManagedFirewall {
                name: d.hostname.unwrap_or_else(|| "Unknown".to_string()),
                serial,
                adom: d.mgt_vdom.unwrap_or_else(|| "root".to_string()),
                oid: d.oid,
            })
        })
        .collect();

    firewalls.sort_by_key(ManagedFirewall::label);
    firewalls
}

/// `target` forms accepted by different manager versions, most specific first.
fn target_variants(firewall: &ManagedFirewall) -> Vec<Value> {
    let scoped = format!("adom/{}/device/{}", firewall.adom, firewall.name);
    vec![
        json!(scoped),
        json!([scoped]),
        json!([format!("device/{}", firewall.name)]),
        json!([firewall.name]),
        json!(firewall.name),
    ]
}
