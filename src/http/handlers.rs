//! Axum HTTP handlers
//!
//! The landing page, map configuration, and the Zabbix/NetBox proxy endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    errors::AppError,
    map::{LatLng, MapConfig, MapView, TileCoord, ViewportSize},
    netbox::{self, SiteQuery},
    pages,
    zabbix::{self, HostQuery},
    AppState,
};

const DEFAULT_VIEWPORT: ViewportSize = ViewportSize {
    width: 1024,
    height: 768,
};
const MAX_VIEWPORT_EDGE: u32 = 8192;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TileRequest {
    #[serde(flatten)]
    pub coord: TileCoord,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct TilePlan {
    pub center: LatLng,
    pub zoom: u8,
    pub viewport: ViewportSize,
    pub tiles: Vec<TileRequest>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn api_status() -> Json<StatusResponse> {
    info!("status endpoint hit");
    Json(StatusResponse {
        status: "ok",
        message: "API is working",
    })
}

pub async fn index() -> Result<Html<String>, AppError> {
    info!("index page hit");
    let view = landing_view()?;
    let html = pages::render_index(&view.config())
        .map_err(|err| AppError::internal(format!("failed to render index page: {err}")))?;
    Ok(Html(html))
}

pub async fn map_config() -> Result<Json<MapConfig>, AppError> {
    Ok(Json(landing_view()?.config()))
}

pub async fn map_tiles(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let mut view = landing_view()?;

    let lat = parse_param::<f64>(&params, "lat")?.unwrap_or(view.center().lat);
    let lng = parse_param::<f64>(&params, "lng")?.unwrap_or(view.center().lng);
    view.pan_to(LatLng::new(lat, lng))
        .map_err(|_| AppError::bad_request("Invalid query parameter: lat/lng"))?;
    if let Some(zoom) = parse_param::<u8>(&params, "zoom")? {
        view.set_zoom(zoom);
    }

    let viewport = ViewportSize::new(
        parse_edge(&params, "width")?.unwrap_or(DEFAULT_VIEWPORT.width),
        parse_edge(&params, "height")?.unwrap_or(DEFAULT_VIEWPORT.height),
    );
    let retina = parse_param::<bool>(&params, "retina")?.unwrap_or(false);

    let tiles = view
        .visible_tiles(viewport)
        .map_err(|err| AppError::bad_request(err.to_string()))?
        .into_iter()
        .map(|coord| TileRequest {
            url: view.tile_layer().tile_url(&coord, retina),
            coord,
        })
        .collect();

    let plan = TilePlan {
        center: view.center(),
        zoom: view.zoom(),
        viewport,
        tiles,
    };
    Ok(Json(json!({ "status": "ok", "result": plan })))
}

pub async fn zabbix_hosts(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    info!("zabbix hosts endpoint hit");
    let query = HostQuery::from_params(&params)?;
    let hosts = zabbix::list_hosts(state.zabbix.as_ref(), &query).await?;
    Ok(Json(json!({ "status": "ok", "result": hosts })))
}

pub async fn netbox_sites(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    info!("netbox sites endpoint hit");
    let query = SiteQuery::from_params(&params)?;
    let sites = netbox::list_site_summaries(state.netbox.as_ref(), &query).await?;
    Ok(Json(json!({ "status": "ok", "result": sites })))
}

/// Answered by the security middleware before it gets here.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn landing_view() -> Result<MapView, AppError> {
    MapView::initialize(&pages::index_document())
        .map_err(|err| AppError::internal(format!("map view failed to initialize: {err}")))
}

fn parse_param<T: std::str::FromStr>(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    params
        .get(name)
        .map(|raw| raw.trim().parse::<T>().map_err(|_| AppError::invalid_param(name)))
        .transpose()
}

fn parse_edge(params: &HashMap<String, String>, name: &str) -> Result<Option<u32>, AppError> {
    match parse_param::<u32>(params, name)? {
        Some(edge) if edge == 0 || edge > MAX_VIEWPORT_EDGE => Err(AppError::invalid_param(name)),
        edge => Ok(edge),
    }
}
