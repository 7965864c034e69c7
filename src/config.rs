use std::{env, net::SocketAddr};

use axum::http::HeaderName;
use thiserror::Error;

pub const DEFAULT_CUSTOM_AUTH_HEADER: &str = "X-RFP-Customer";
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub zabbix: UpstreamSettings,
    pub netbox: UpstreamSettings,
    pub security: SecuritySettings,
}

/// Connection settings for an upstream API. Missing values are reported when
/// the upstream is first called, not at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamSettings {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub allowed_domains: Vec<String>,
    pub custom_header: ConfiguredHeader,
    pub api_key_header: ConfiguredHeader,
    pub api_keys: Vec<String>,
}

/// A header name as configured, plus its normalized form for lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredHeader {
    pub name: HeaderName,
    pub label: String,
}

impl ConfiguredHeader {
    pub fn parse(label: &str) -> Option<Self> {
        let name = HeaderName::try_from(label).ok()?;
        Some(Self {
            name,
            label: label.to_string(),
        })
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            custom_header: ConfiguredHeader {
                name: HeaderName::from_static("x-rfp-customer"),
                label: DEFAULT_CUSTOM_AUTH_HEADER.to_string(),
            },
            api_key_header: ConfiguredHeader {
                name: HeaderName::from_static("x-api-key"),
                label: DEFAULT_API_KEY_HEADER.to_string(),
            },
            api_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("{0} must be a valid HTTP header name")]
    InvalidHeaderName(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(5000);

        let zabbix = UpstreamSettings {
            url: non_empty("ZABBIX_API_URL"),
            token: non_empty("ZABBIX_API_TOKEN"),
        };
        let netbox = UpstreamSettings {
            url: non_empty("NETBOX_API_URL"),
            token: non_empty("NETBOX_API_TOKEN"),
        };

        let custom_header = parse_header_name(
            "CUSTOM_AUTH_HEADER",
            non_empty("CUSTOM_AUTH_HEADER").as_deref(),
            DEFAULT_CUSTOM_AUTH_HEADER,
        )?;
        let api_key_header = parse_header_name(
            "API_KEY_HEADER",
            non_empty("API_KEY_HEADER").as_deref(),
            DEFAULT_API_KEY_HEADER,
        )?;

        let security = SecuritySettings {
            allowed_domains: split_list(lookup("ALLOWED_DOMAINS").as_deref()),
            custom_header,
            api_key_header,
            api_keys: split_list(lookup("API_KEYS").as_deref()),
        };

        let config = Self {
            bind_addr,
            bind_port,
            zabbix,
            netbox,
            security,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_header_name(
    key: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<ConfiguredHeader, ConfigError> {
    ConfiguredHeader::parse(value.unwrap_or(default)).ok_or(ConfigError::InvalidHeaderName(key))
}

/// Splits a comma separated list, dropping blank entries.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
