//! Geographic coordinates and Web Mercator (EPSG:3857) pixel projection

use std::f64::consts::PI;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;
/// Deepest zoom whose tile indices still fit the `u32` coordinates.
pub const MAX_TILE_ZOOM: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Projects to world pixel coordinates at `zoom` for square tiles of
    /// `tile_size` pixels.
    pub fn project(&self, zoom: u8, tile_size: u32) -> Point {
        let scale = f64::from(tile_size) * 2_f64.powi(i32::from(zoom));
        let lat_rad = Self::clamp_lat(self.lat).to_radians();

        let x = (self.lng + 180.0) / 360.0 * scale;
        let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;
        Point::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// A slippy map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The tile containing `lat_lng` at `zoom`.
    pub fn from_lat_lng(lat_lng: &LatLng, zoom: u8) -> Self {
        let n = 2_f64.powi(i32::from(zoom));
        let max_index = n - 1.0;
        let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();

        let x = ((lat_lng.lng + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
            .floor()
            .clamp(0.0, max_index);

        Self::new(x as u32, y as u32, zoom)
    }

    pub fn is_valid(&self) -> bool {
        if self.z > MAX_TILE_ZOOM {
            return false;
        }
        match 1_u64.checked_shl(u32::from(self.z)) {
            Some(max_coord) => u64::from(self.x) < max_coord && u64::from(self.y) < max_coord,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_coordinate_ranges() {
        assert!(LatLng::new(41.8781, -87.6298).is_valid());
        assert!(LatLng::new(-90.0, 180.0).is_valid());
        assert!(!LatLng::new(90.5, 0.0).is_valid());
        assert!(!LatLng::new(0.0, -180.1).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn projects_origin_to_world_center() {
        let point = LatLng::new(0.0, 0.0).project(1, 256);
        assert!((point.x - 256.0).abs() < 1e-9);
        assert!((point.y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn projection_clamps_poles() {
        let north = LatLng::new(90.0, 0.0).project(0, 256);
        assert!(north.y.abs() < 1e-6);
    }

    #[test]
    fn tile_from_lat_lng_matches_projection() {
        let chicago = LatLng::new(41.8781, -87.6298);
        let tile = TileCoord::from_lat_lng(&chicago, 5);
        let pixel = chicago.project(5, 256);

        assert_eq!(tile, TileCoord::new(8, 11, 5));
        assert_eq!(tile.x, (pixel.x / 256.0).floor() as u32);
        assert_eq!(tile.y, (pixel.y / 256.0).floor() as u32);
        assert!(tile.is_valid());
    }

    #[test]
    fn tile_validity_depends_on_zoom() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(!TileCoord::new(1, 0, 0).is_valid());
        assert!(TileCoord::new(524_287, 524_287, 19).is_valid());
        assert!(!TileCoord::new(524_288, 0, 19).is_valid());
    }

    #[test]
    fn zoom_beyond_tile_range_is_invalid() {
        assert!(TileCoord::new(0, 0, MAX_TILE_ZOOM).is_valid());
        assert!(!TileCoord::new(0, 0, MAX_TILE_ZOOM + 1).is_valid());
        assert!(!TileCoord::new(0, 0, 64).is_valid());
        assert!(!TileCoord::new(0, 0, u8::MAX).is_valid());
    }

    #[test]
    fn points_add_and_subtract() {
        let center = Point::new(10.0, 20.0);
        let half = Point::new(4.0, 6.0);
        assert_eq!(center + half, Point::new(14.0, 26.0));
        assert_eq!(center - half, Point::new(6.0, 14.0));
    }
}
