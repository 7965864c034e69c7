//! Map widget model
//!
//! A single map view mounted into the landing page, centered on a fixed
//! coordinate, with one raster tile layer. The browser renders it; this module
//! owns its configuration and works out which tiles a viewport needs.

pub mod geo;
pub mod tile;
pub mod view;

pub use geo::{LatLng, TileCoord};
pub use tile::TileLayer;
pub use view::{Document, MapConfig, MapError, MapView, ViewportSize};
