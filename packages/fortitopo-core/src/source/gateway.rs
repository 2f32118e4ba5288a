use super::SourceError;
use crate::config::ConnectionConfig;
use crate::records::GatewayRecord;
use serde_json::Value;

/// Client for the FortiGate REST API (`/api/v2`).
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    pub fn new(config: &ConnectionConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: super::http_client(config)?,
            base_url: format!("{}/api/v2", config.base_url()),
            token: config.token.clone(),
        })
    }

    /// `GET /api/v2<endpoint>` and decode the JSON body.
    pub async fn get(&self, endpoint: &str) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                url,
                status: resp.status(),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|source| SourceError::Http { url, source })
    }

    /// Serial and hostname of the firewall. Missing pieces stay `None` so the
    /// catalog applies its fallbacks.
    pub async fn gateway_record(&self) -> GatewayRecord {
        tracing::info!("Fetching hostname and serial");

        let license = self
            .get(super::LICENSE_STATUS_ENDPOINT)
            .await
            .inspect_err(|e| tracing::warn!("Could not read license status: {}", e))
            .ok();
        let system = self
            .get(super::SYSTEM_STATUS_ENDPOINT)
            .await
            .inspect_err(|e| tracing::warn!("Could not read system status: {}", e))
            .ok();

        gateway_from_status(license.as_ref(), system.as_ref())
    }
}

/// Extract the gateway identity from the license and system status responses.
pub(crate) fn gateway_from_status(license: Option<&Value>, system: Option<&Value>) -> GatewayRecord {
    GatewayRecord {
        serial: license
            .and_then(|v| v.get("serial"))
            .and_then(Value::as_str)
            .map(str::to_string),
        hostname: system
            .and_then(|v| v.get("results"))
            .and_then(|r| r.get("hostname"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
