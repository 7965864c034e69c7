//! Zabbix JSON-RPC client and host inventory queries

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::UpstreamSettings,
    errors::{AppError, UpstreamError},
};

const JSONRPC_ENDPOINT: &str = "api_jsonrpc.php";
const DEFAULT_HOST_FIELDS: [&str; 3] = ["hostid", "host", "name"];
const INTERFACE_FIELDS: [&str; 2] = ["interfaceid", "ip"];

#[async_trait]
pub trait ZabbixApi: Send + Sync {
    /// Calls `method` and returns the `result` member of the response.
    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ZabbixClient {
    settings: UpstreamSettings,
    http: reqwest::Client,
}

impl ZabbixClient {
    pub fn new(settings: UpstreamSettings, http: reqwest::Client) -> Self {
        Self { settings, http }
    }

    fn endpoint(&self) -> Result<String, UpstreamError> {
        let base = self
            .settings
            .url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| UpstreamError::Config("ZABBIX_API_URL is not set".to_string()))?;

        if base.ends_with(JSONRPC_ENDPOINT) {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}/{JSONRPC_ENDPOINT}"))
        }
    }

    fn token(&self) -> Result<&str, UpstreamError> {
        self.settings
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| UpstreamError::Config("ZABBIX_API_TOKEN is not set".to_string()))
    }
}

#[async_trait]
impl ZabbixApi for ZabbixClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let url = self.endpoint()?;
        let token = self.token()?;
        let rpc_id = Uuid::new_v4().simple().to_string();

        let params = if params.is_null() { json!({}) } else { params };
        let body = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: rpc_id.clone(),
        };

        info!(method, rpc_id = %rpc_id, "zabbix request start");
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json-rpc")
            .body(serde_json::to_vec(&body).map_err(|err| UpstreamError::Decode {
                service: "zabbix",
                message: err.to_string(),
            })?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: "zabbix",
                status: status.as_u16(),
            });
        }

        let payload: RpcResponse = response.json().await.map_err(|err| UpstreamError::Decode {
            service: "zabbix",
            message: err.to_string(),
        })?;

        if let Some(error) = payload.error {
            warn!(method, rpc_id = %rpc_id, error = %error, "zabbix api error");
            return Err(UpstreamError::Rpc(error));
        }

        info!(method, rpc_id = %rpc_id, "zabbix request ok");
        Ok(payload.result.unwrap_or_else(|| json!([])))
    }
}

/// Which parts of the host objects `host.get` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostQuery {
    pub fields: Vec<String>,
    pub with_interfaces: bool,
    pub with_inventory: bool,
    /// Empty means the full inventory.
    pub inventory_fields: Vec<String>,
    pub limit: Option<u32>,
}

impl Default for HostQuery {
    fn default() -> Self {
        Self {
            fields: DEFAULT_HOST_FIELDS.iter().map(|f| f.to_string()).collect(),
            with_interfaces: true,
            with_inventory: true,
            inventory_fields: Vec::new(),
            limit: None,
        }
    }
}

impl HostQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut query = Self::default();

        if let Some(flag) = params.get("with_interfaces") {
            query.with_interfaces = flag_enabled(flag);
        }
        if let Some(flag) = params.get("with_inventory") {
            query.with_inventory = flag_enabled(flag);
        }

        let fields = params.get("fields").map(|raw| split_fields(raw)).unwrap_or_default();
        if !fields.is_empty() {
            query.fields = fields;
        }
        query.inventory_fields = params
            .get("inventory_fields")
            .map(|raw| split_fields(raw))
            .unwrap_or_default();

        if let Some(raw) = params.get("limit").filter(|raw| !raw.is_empty()) {
            match raw.trim().parse::<u32>() {
                Ok(limit) if limit > 0 => query.limit = Some(limit),
                _ => {
                    warn!(limit = %raw, "invalid 'limit' param");
                    return Err(AppError::invalid_param("limit"));
                }
            }
        }

        Ok(query)
    }

    /// Parameters for `host.get`.
    pub fn to_rpc_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("output".to_string(), json!(self.fields));

        if self.with_interfaces {
            params.insert("selectInterfaces".to_string(), json!(INTERFACE_FIELDS));
        }
        if self.with_inventory {
            let inventory = if self.inventory_fields.is_empty() {
                json!("extend")
            } else {
                json!(self.inventory_fields)
            };
            params.insert("selectInventory".to_string(), inventory);
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), json!(limit));
        }

        Value::Object(params)
    }
}

pub async fn list_hosts(api: &dyn ZabbixApi, query: &HostQuery) -> Result<Value, UpstreamError> {
    api.call("host.get", query.to_rpc_params()).await
}

/// Anything but a case-insensitive `false` keeps the flag on.
fn flag_enabled(raw: &str) -> bool {
    !raw.trim().eq_ignore_ascii_case("false")
}

fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}
