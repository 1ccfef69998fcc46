//! Map View
//!
//! The fixed map shown on the dashboard. Every field is a constant for the
//! life of the process; the renderer builds a fresh [`MapView`] per page and
//! always gets the same values.

use serde::Serialize;

/// Default center: San Francisco
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 37.7749,
    lng: -122.4194,
};

/// Default zoom level
pub const DEFAULT_ZOOM: u8 = 13;

/// Attribution text required by the OpenStreetMap tile usage policy
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Tile provider for the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TileSource {
    OpenStreetMap,
}

impl TileSource {
    /// Provider name as shown to users
    pub fn name(&self) -> &'static str {
        match self {
            TileSource::OpenStreetMap => "OpenStreetMap",
        }
    }

    /// Leaflet URL template for this provider
    pub fn url_template(&self) -> &'static str {
        match self {
            TileSource::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    /// Maximum zoom the provider serves
    pub fn max_zoom(&self) -> u8 {
        match self {
            TileSource::OpenStreetMap => 19,
        }
    }
}

/// The map surface parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom_level: u8,
    pub tile_source: TileSource,
    pub attribution: String,
}

impl MapView {
    /// The dashboard's map: San Francisco at zoom 13 on OpenStreetMap tiles
    pub fn fixed() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom_level: DEFAULT_ZOOM,
            tile_source: TileSource::OpenStreetMap,
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::fixed()
    }
}

/// On-page dimensions of the map surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapSize {
    /// `None` fills the available width
    pub width: Option<u32>,
    pub height: u32,
}

impl MapSize {
    /// Full container width, 600 px tall
    pub const FLUID: MapSize = MapSize {
        width: None,
        height: 600,
    };

    /// 700 × 500 px
    pub const FIXED: MapSize = MapSize {
        width: Some(700),
        height: 500,
    };

    /// CSS `width` value
    pub fn css_width(&self) -> String {
        match self.width {
            Some(w) => format!("{}px", w),
            None => "100%".to_string(),
        }
    }

    /// CSS `height` value
    pub fn css_height(&self) -> String {
        format!("{}px", self.height)
    }
}
