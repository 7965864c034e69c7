//! NetBox REST client for DCIM sites

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::UpstreamSettings,
    errors::{AppError, UpstreamError},
};

const SITES_PATH: &str = "/api/dcim/sites/";

#[async_trait]
pub trait NetboxApi: Send + Sync {
    /// Raw page of `dcim.sites` objects.
    async fn list_sites(&self, query: &SiteQuery) -> Result<Value, UpstreamError>;
}

/// Filters and paging passed through to NetBox. `limit = 0` asks NetBox for
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteQuery {
    pub limit: u32,
    pub offset: Option<u32>,
    pub q: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl SiteQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let limit = match params.get("limit") {
            Some(raw) => parse_non_negative("limit", raw)?,
            None => 0,
        };
        let offset = params
            .get("offset")
            .map(|raw| parse_non_negative("offset", raw))
            .transpose()?;

        let filter = |key: &str| params.get(key).filter(|value| !value.is_empty()).cloned();

        Ok(Self {
            limit,
            offset,
            q: filter("q"),
            name: filter("name"),
            slug: filter("slug"),
        })
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        for (key, value) in [("q", &self.q), ("name", &self.name), ("slug", &self.slug)] {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs
    }
}

fn parse_non_negative(name: &'static str, raw: &str) -> Result<u32, AppError> {
    raw.trim().parse::<u32>().map_err(|_| {
        warn!(param = name, value = %raw, "invalid query param");
        AppError::invalid_param(name)
    })
}

/// The compact view of a site returned to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub id: Value,
    pub name: Value,
    pub status: Value,
    pub location: Value,
    pub lat: Value,
    pub long: Value,
}

impl SiteSummary {
    pub fn from_site(site: &Value) -> Self {
        let field = |key: &str| site.get(key).cloned().unwrap_or(Value::Null);

        let status = match site.get("status") {
            Some(Value::Object(status)) => status.get("label").cloned().unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        };

        Self {
            id: field("id"),
            name: field("name"),
            status,
            location: field("physical_address"),
            lat: field("latitude"),
            long: field("longitude"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteList {
    pub count: usize,
    pub results: Vec<SiteSummary>,
}

pub async fn list_site_summaries(
    api: &dyn NetboxApi,
    query: &SiteQuery,
) -> Result<SiteList, UpstreamError> {
    let page = api.list_sites(query).await?;
    let results: Vec<SiteSummary> = page
        .get("results")
        .and_then(Value::as_array)
        .map(|sites| sites.iter().map(SiteSummary::from_site).collect())
        .unwrap_or_default();

    info!(sites = results.len(), "netbox request ok");
    Ok(SiteList {
        count: results.len(),
        results,
    })
}

#[derive(Debug, Clone)]
pub struct NetboxClient {
    settings: UpstreamSettings,
    http: reqwest::Client,
}

impl NetboxClient {
    pub fn new(settings: UpstreamSettings, http: reqwest::Client) -> Self {
        Self { settings, http }
    }

    /// Base URL without trailing slash. Bare hosts default to `http://`.
    fn base_url(&self) -> Result<String, UpstreamError> {
        let base = self
            .settings
            .url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| UpstreamError::Config("NETBOX_API_URL is not set".to_string()))?;

        if base.starts_with("http://") || base.starts_with("https://") {
            Ok(base.to_string())
        } else {
            Ok(format!("http://{base}"))
        }
    }

    fn token(&self) -> Result<&str, UpstreamError> {
        self.settings
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| UpstreamError::Config("NETBOX_API_TOKEN is not set".to_string()))
    }
}

#[async_trait]
impl NetboxApi for NetboxClient {
    async fn list_sites(&self, query: &SiteQuery) -> Result<Value, UpstreamError> {
        let url = format!("{}{SITES_PATH}", self.base_url()?);
        let token = self.token()?;
        let pairs = query.to_pairs();

        info!(url = %url, params = ?pairs, "netbox request start");
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Token {token}"))
            .header(ACCEPT, "application/json")
            .query(&pairs)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: "netbox",
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|err| UpstreamError::Decode {
            service: "netbox",
            message: err.to_string(),
        })
    }
}
