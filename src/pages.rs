//! Server-rendered HTML pages

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::map::{Document, MapConfig};

const LEAFLET_VERSION: &str = "1.9.4";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>ZabUX</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@{{leaflet}}/dist/leaflet.css">
  <style>
    html, body { height: 100%; margin: 0; background: #111; }
    #map { height: 100%; width: 100%; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script id="map-config" type="application/json">{{config}}</script>
  <script src="https://unpkg.com/leaflet@{{leaflet}}/dist/leaflet.js"></script>
  <script>
    document.addEventListener("DOMContentLoaded", function () {
      var cfg = JSON.parse(document.getElementById("map-config").textContent);
      var map = L.map(cfg.mount).setView([cfg.center.lat, cfg.center.lng], cfg.zoom);
      L.tileLayer(cfg.tile_layer.url_template, {
        attribution: cfg.tile_layer.attribution,
        subdomains: cfg.tile_layer.subdomains,
        maxZoom: cfg.tile_layer.max_zoom
      }).addTo(map);
    });
  </script>
</body>
</html>
"#;

/// Renders the landing page with the map mount point and its configuration.
pub fn render_index(config: &MapConfig) -> Result<String, serde_json::Error> {
    // `</` would close the script element early.
    let config_json = serde_json::to_string(config)?.replace("</", "<\\/");

    Ok(INDEX_TEMPLATE
        .replace("{{leaflet}}", LEAFLET_VERSION)
        .replace("{{config}}", &config_json))
}

/// The landing page as the browser sees it before the map script runs.
pub fn index_document() -> HtmlDocument {
    HtmlDocument::parse(INDEX_TEMPLATE)
}

/// The element ids present in an HTML page.
#[derive(Debug, Default)]
pub struct HtmlDocument {
    ids: HashSet<String>,
}

fn id_attribute() -> &'static Regex {
    static ID_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ID_ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"(?i)<[a-z][^>]*?\sid\s*=\s*["']([^"']+)["']"#).expect("valid id regex")
    })
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let ids = id_attribute()
            .captures_iter(html)
            .map(|captures| captures[1].to_string())
            .collect();
        Self { ids }
    }
}

impl Document for HtmlDocument {
    fn has_element(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}
