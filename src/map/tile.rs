//! The single raster tile layer and its URL template

use serde::Serialize;

use super::geo::TileCoord;

pub const DARK_MATTER_URL: &str =
    "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png";
pub const DARK_MATTER_SUBDOMAINS: [&str; 4] = ["a", "b", "c", "d"];
pub const DARK_MATTER_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";
pub const DARK_MATTER_MAX_ZOOM: u8 = 19;

const RETINA_SUFFIX: &str = "@2x";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url_template: String,
    pub subdomains: Vec<String>,
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub tile_size: u32,
}

impl TileLayer {
    /// CARTO's dark basemap.
    pub fn dark_matter() -> Self {
        Self {
            url_template: DARK_MATTER_URL.to_string(),
            subdomains: DARK_MATTER_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            attribution: DARK_MATTER_ATTRIBUTION.to_string(),
            min_zoom: 0,
            max_zoom: DARK_MATTER_MAX_ZOOM,
            tile_size: 256,
        }
    }

    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Subdomain for a tile, rotated over `(x + y)` so neighbouring tiles spread
    /// across hosts.
    pub fn subdomain(&self, coord: &TileCoord) -> Option<&str> {
        if self.subdomains.is_empty() {
            return None;
        }
        let index = (u64::from(coord.x) + u64::from(coord.y)) % self.subdomains.len() as u64;
        self.subdomains.get(index as usize).map(String::as_str)
    }

    /// Expands the template for `coord`. `{r}` becomes `@2x` for high density
    /// displays.
    pub fn tile_url(&self, coord: &TileCoord, retina: bool) -> String {
        self.url_template
            .replace("{s}", self.subdomain(coord).unwrap_or_default())
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{r}", if retina { RETINA_SUFFIX } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_matter_descriptor() {
        let layer = TileLayer::dark_matter();
        assert_eq!(
            layer.url_template,
            "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png"
        );
        assert_eq!(layer.subdomains, vec!["a", "b", "c", "d"]);
        assert_eq!(layer.max_zoom, 19);
        assert!(layer.attribution.contains("OpenStreetMap"));
        assert!(layer.attribution.contains("CARTO"));
    }

    #[test]
    fn expands_template() {
        let layer = TileLayer::dark_matter();
        assert_eq!(
            layer.tile_url(&TileCoord::new(8, 11, 5), false),
            "https://d.basemaps.cartocdn.com/dark_all/5/8/11.png"
        );
        assert_eq!(
            layer.tile_url(&TileCoord::new(1, 0, 1), true),
            "https://b.basemaps.cartocdn.com/dark_all/1/1/0@2x.png"
        );
    }

    #[test]
    fn subdomains_rotate() {
        let layer = TileLayer::dark_matter();
        let picked: Vec<_> = (0..5)
            .map(|x| layer.subdomain(&TileCoord::new(x, 0, 3)).unwrap_or_default().to_string())
            .collect();
        assert_eq!(picked, vec!["a", "b", "c", "d", "a"]);
    }

    #[test]
    fn template_without_subdomains_still_expands() {
        let layer = TileLayer {
            url_template: "https://tile.example.com/{z}/{x}/{y}.png".to_string(),
            subdomains: vec![],
            ..TileLayer::dark_matter()
        };
        assert_eq!(layer.subdomain(&TileCoord::new(0, 0, 0)), None);
        assert_eq!(
            layer.tile_url(&TileCoord::new(2, 3, 4), true),
            "https://tile.example.com/4/2/3.png"
        );
    }

    #[test]
    fn zoom_is_clamped_to_provider_range() {
        let layer = TileLayer::dark_matter();
        assert_eq!(layer.clamp_zoom(25), 19);
        assert_eq!(layer.clamp_zoom(7), 7);
    }
}
