//! The map view bound to a page mount point

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    geo::{LatLng, Point, TileCoord, MAX_TILE_ZOOM},
    tile::TileLayer,
};

pub const MOUNT_ELEMENT_ID: &str = "map";
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 41.8781,
    lng: -87.6298,
};
pub const DEFAULT_ZOOM: u8 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("mount element #{0} not found in page")]
    MountNotFound(String),
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("viewport must have a non-zero size")]
    EmptyViewport,
    #[error("invalid tile layer: {0}")]
    InvalidTileLayer(String),
}

/// Anything the map can be mounted into.
pub trait Document {
    fn has_element(&self, id: &str) -> bool;
}

/// Size of the rendered map surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    mount: String,
    center: LatLng,
    zoom: u8,
    tile_layer: TileLayer,
}

/// Everything the page script needs to build the same view client side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapConfig {
    pub mount: String,
    pub center: LatLng,
    pub zoom: u8,
    pub tile_layer: TileLayer,
}

impl MapView {
    /// Builds the default view into the `#map` element of `document`.
    pub fn initialize(document: &impl Document) -> Result<Self, MapError> {
        Self::initialize_with(
            document,
            MOUNT_ELEMENT_ID,
            DEFAULT_CENTER,
            DEFAULT_ZOOM,
            TileLayer::dark_matter(),
        )
    }

    pub fn initialize_with(
        document: &impl Document,
        mount: &str,
        center: LatLng,
        zoom: u8,
        tile_layer: TileLayer,
    ) -> Result<Self, MapError> {
        if !document.has_element(mount) {
            return Err(MapError::MountNotFound(mount.to_string()));
        }
        if !center.is_valid() {
            return Err(MapError::InvalidCoordinate {
                lat: center.lat,
                lng: center.lng,
            });
        }
        if tile_layer.tile_size == 0 {
            return Err(MapError::InvalidTileLayer(
                "tile size must be non-zero".to_string(),
            ));
        }
        if tile_layer.min_zoom > tile_layer.max_zoom || tile_layer.max_zoom > MAX_TILE_ZOOM {
            return Err(MapError::InvalidTileLayer(format!(
                "zoom range {}..={} must lie within 0..={MAX_TILE_ZOOM}",
                tile_layer.min_zoom, tile_layer.max_zoom
            )));
        }

        let zoom = tile_layer.clamp_zoom(zoom);
        tracing::debug!(mount, lat = center.lat, lng = center.lng, zoom, "map view initialized");

        Ok(Self {
            mount: mount.to_string(),
            center,
            zoom,
            tile_layer,
        })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_layer(&self) -> &TileLayer {
        &self.tile_layer
    }

    pub fn pan_to(&mut self, center: LatLng) -> Result<(), MapError> {
        if !center.is_valid() {
            return Err(MapError::InvalidCoordinate {
                lat: center.lat,
                lng: center.lng,
            });
        }
        self.center = center;
        Ok(())
    }

    /// Sets the zoom, clamped to what the tile provider serves. Returns the
    /// zoom actually applied.
    pub fn set_zoom(&mut self, zoom: u8) -> u8 {
        self.zoom = self.tile_layer.clamp_zoom(zoom);
        self.zoom
    }

    /// Tiles covering the viewport around the current center, nearest to the
    /// center first. Columns wrap around the antimeridian, rows outside the
    /// world are dropped.
    pub fn visible_tiles(&self, size: ViewportSize) -> Result<Vec<TileCoord>, MapError> {
        if size.width == 0 || size.height == 0 {
            return Err(MapError::EmptyViewport);
        }

        let tile_size = f64::from(self.tile_layer.tile_size);
        let pixel_center = self.center.project(self.zoom, self.tile_layer.tile_size);
        let half = Point::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
        let min = pixel_center - half;
        let max = pixel_center + half;

        let min_x = (min.x / tile_size).floor() as i64;
        let min_y = (min.y / tile_size).floor() as i64;
        let max_x = (max.x / tile_size).ceil() as i64 - 1;
        let max_y = (max.y / tile_size).ceil() as i64 - 1;

        let world = 1_i64
            .checked_shl(u32::from(self.zoom))
            .filter(|_| self.zoom <= MAX_TILE_ZOOM)
            .ok_or_else(|| {
                MapError::InvalidTileLayer(format!("zoom {} has no tile grid", self.zoom))
            })?;
        let center_tile = Point::new(pixel_center.x / tile_size, pixel_center.y / tile_size);

        let mut ranked = Vec::new();
        for y in min_y.max(0)..=max_y.min(world - 1) {
            for x in min_x..=max_x {
                let wrapped = x.rem_euclid(world);
                let dx = x as f64 + 0.5 - center_tile.x;
                let dy = y as f64 + 0.5 - center_tile.y;
                ranked.push((dx * dx + dy * dy, TileCoord::new(wrapped as u32, y as u32, self.zoom)));
            }
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut seen = HashSet::new();
        Ok(ranked
            .into_iter()
            .map(|(_, coord)| coord)
            .filter(|coord| seen.insert(*coord))
            .collect())
    }

    /// URLs the page fetches to fill the viewport.
    pub fn tile_requests(&self, size: ViewportSize, retina: bool) -> Result<Vec<String>, MapError> {
        Ok(self
            .visible_tiles(size)?
            .iter()
            .map(|coord| self.tile_layer.tile_url(coord, retina))
            .collect())
    }

    pub fn config(&self) -> MapConfig {
        MapConfig {
            mount: self.mount.clone(),
            center: self.center,
            zoom: self.zoom,
            tile_layer: self.tile_layer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;

    struct Page(Vec<&'static str>);

    impl Document for Page {
        fn has_element(&self, id: &str) -> bool {
            self.0.iter().any(|element| *element == id)
        }
    }

    fn url_pattern() -> Regex {
        Regex::new(r"^https://[abcd]\.basemaps\.cartocdn\.com/dark_all/(\d+)/(\d+)/(\d+)(@2x)?\.png$")
            .expect("valid regex")
    }

    #[test]
    fn initialize_uses_fixed_view() {
        let view = MapView::initialize(&Page(vec!["header", "map"])).expect("map view");

        assert_eq!(view.mount(), "map");
        assert_eq!(view.center(), LatLng::new(41.8781, -87.6298));
        assert_eq!(view.zoom(), 5);
        assert_eq!(view.tile_layer(), &TileLayer::dark_matter());
    }

    #[test]
    fn initialize_without_mount_fails() {
        let err = MapView::initialize(&Page(vec!["header"])).expect_err("missing mount");
        assert_eq!(err, MapError::MountNotFound("map".to_string()));
    }

    #[test]
    fn initialize_rejects_invalid_center() {
        let err = MapView::initialize_with(
            &Page(vec!["map"]),
            "map",
            LatLng::new(120.0, 0.0),
            3,
            TileLayer::dark_matter(),
        )
        .expect_err("invalid center");
        assert!(matches!(err, MapError::InvalidCoordinate { .. }));
    }

    #[test]
    fn initialize_rejects_unusable_tile_layers() {
        let zero_size = TileLayer {
            tile_size: 0,
            ..TileLayer::dark_matter()
        };
        let err = MapView::initialize_with(&Page(vec!["map"]), "map", DEFAULT_CENTER, 3, zero_size)
            .expect_err("zero tile size");
        assert!(matches!(err, MapError::InvalidTileLayer(_)));

        let too_deep = TileLayer {
            max_zoom: 64,
            ..TileLayer::dark_matter()
        };
        let err = MapView::initialize_with(&Page(vec!["map"]), "map", DEFAULT_CENTER, 64, too_deep)
            .expect_err("zoom beyond tile grid");
        assert!(matches!(err, MapError::InvalidTileLayer(_)));

        let deepest = TileLayer {
            max_zoom: MAX_TILE_ZOOM,
            ..TileLayer::dark_matter()
        };
        let mut view = MapView::initialize_with(&Page(vec!["map"]), "map", DEFAULT_CENTER, 40, deepest)
            .expect("deepest zoom accepted");
        assert_eq!(view.zoom(), MAX_TILE_ZOOM);
        let tiles = view.visible_tiles(ViewportSize::new(256, 256)).expect("tiles");
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(TileCoord::is_valid));
        assert_eq!(view.set_zoom(u8::MAX), MAX_TILE_ZOOM);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        assert_eq!(view.set_zoom(30), 19);
        assert_eq!(view.zoom(), 19);
        assert_eq!(view.set_zoom(2), 2);
    }

    #[test]
    fn pan_rejects_invalid_center_and_keeps_previous() {
        let mut view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        assert!(view.pan_to(LatLng::new(0.0, 200.0)).is_err());
        assert_eq!(view.center(), DEFAULT_CENTER);
    }

    #[test]
    fn visible_tiles_cover_viewport() {
        let mut view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        view.pan_to(LatLng::new(0.0, 0.0)).expect("valid center");
        view.set_zoom(1);

        let tiles = view.visible_tiles(ViewportSize::new(512, 512)).expect("tiles");
        let mut sorted = tiles.clone();
        sorted.sort();
        assert_eq!(
            sorted,
            vec![
                TileCoord::new(0, 0, 1),
                TileCoord::new(0, 1, 1),
                TileCoord::new(1, 0, 1),
                TileCoord::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn visible_tiles_wrap_and_dedupe() {
        let mut view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        view.pan_to(LatLng::new(0.0, 0.0)).expect("valid center");
        view.set_zoom(0);

        let tiles = view.visible_tiles(ViewportSize::new(1024, 256)).expect("tiles");
        assert_eq!(tiles, vec![TileCoord::new(0, 0, 0)]);
    }

    #[test]
    fn nearest_tile_comes_first() {
        let view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        let tiles = view.visible_tiles(ViewportSize::new(800, 600)).expect("tiles");

        assert_eq!(tiles[0], TileCoord::from_lat_lng(&DEFAULT_CENTER, 5));
        assert!(tiles.iter().all(|tile| tile.z == 5 && tile.is_valid()));
    }

    #[test]
    fn empty_viewport_is_rejected() {
        let view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        assert_eq!(
            view.visible_tiles(ViewportSize::new(0, 300)),
            Err(MapError::EmptyViewport)
        );
    }

    #[test]
    fn panning_and_zooming_request_matching_urls() {
        let mut view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        view.pan_to(LatLng::new(48.8566, 2.3522)).expect("valid center");
        view.set_zoom(12);

        let pattern = url_pattern();
        let urls = view
            .tile_requests(ViewportSize::new(1024, 768), true)
            .expect("tile urls");
        let expected = TileCoord::from_lat_lng(&LatLng::new(48.8566, 2.3522), 12);

        assert!(!urls.is_empty());
        for url in &urls {
            let captures = pattern.captures(url).expect("url matches template");
            assert_eq!(&captures[1], "12");
            assert_eq!(&captures[4], "@2x");
        }
        assert!(urls[0].ends_with(&format!("/12/{}/{}@2x.png", expected.x, expected.y)));
    }

    #[test]
    fn config_mirrors_view() {
        let view = MapView::initialize(&Page(vec!["map"])).expect("map view");
        let config = serde_json::to_value(view.config()).expect("serializable config");

        assert_eq!(config["mount"], "map");
        assert_eq!(config["center"]["lat"], 41.8781);
        assert_eq!(config["zoom"], 5);
        assert_eq!(config["tile_layer"]["max_zoom"], 19);
        assert_eq!(config["tile_layer"]["subdomains"].as_array().map(Vec::len), Some(4));
    }
}
