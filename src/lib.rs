use std::{sync::Arc, time::Duration};

use axum::{middleware, routing::get, Router};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod map;
pub mod netbox;
pub mod pages;
pub mod security;
pub mod zabbix;

use config::Config;
use netbox::{NetboxApi, NetboxClient};
use security::SecurityPolicy;
use zabbix::{ZabbixApi, ZabbixClient};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityPolicy>,
    pub zabbix: Arc<dyn ZabbixApi>,
    pub netbox: Arc<dyn NetboxApi>,
}

impl AppState {
    pub fn new(
        security: SecurityPolicy,
        zabbix: Arc<dyn ZabbixApi>,
        netbox: Arc<dyn NetboxApi>,
    ) -> Self {
        Self {
            security: Arc::new(security),
            zabbix,
            netbox,
        }
    }

    /// Wires the real upstream clients, sharing one connection pool.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::new(
            SecurityPolicy::new(&config.security),
            Arc::new(ZabbixClient::new(config.zabbix.clone(), http.clone())),
            Arc::new(NetboxClient::new(config.netbox.clone(), http)),
        ))
    }
}

pub fn build_app(state: AppState) -> Router {
    let guarded = Router::new()
        .route(
            "/api/zabbix/hosts",
            get(http::handlers::zabbix_hosts).options(http::handlers::preflight),
        )
        .route(
            "/api/netbox/sites",
            get(http::handlers::netbox_sites).options(http::handlers::preflight),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            security::secure_endpoint,
        ));

    Router::new()
        .route("/", get(http::handlers::index))
        .route("/health", get(http::handlers::health))
        .route("/api/status", get(http::handlers::api_status))
        .route("/api/zabux/status", get(http::handlers::api_status))
        .route("/api/map/config", get(http::handlers::map_config))
        .route("/api/map/tiles", get(http::handlers::map_tiles))
        .merge(guarded)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
