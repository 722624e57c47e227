//! Static location maps: a single slippy-map tile with a marker on top.

mod compose;
mod projection;
mod tile_source;

pub use compose::*;
pub use projection::*;
pub use tile_source::*;

use serde::Deserialize;

fn default_tile_url() -> String {
    "https://tiles.api-maps.yandex.ru/v1/tiles/?x={x}&y={y}&z={z}&lang=ru_RU&l=map&apikey={api_key}"
        .to_owned()
}

fn default_zoom() -> u8 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Template of the tile URL with `{x}`, `{y}`, `{z}` and `{api_key}`
    /// placeholders
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: default_tile_url(),
            api_key: String::new(),
            zoom: default_zoom(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Tile URL is invalid: {url}")]
    InvalidTileUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Tile service responded with {status} for {tile:?}")]
    BadTileStatus {
        tile: MapTile,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode the tile image of {tile:?}")]
    DecodeTile {
        tile: MapTile,
        source: image::ImageError,
    },

    #[error("Failed to encode the map image")]
    Encode { source: image::ImageError },

    #[error("Zoom level {zoom} is out of the supported range 0..=22")]
    InvalidZoom { zoom: u8 },
}
