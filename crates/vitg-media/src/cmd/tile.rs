use crate::map::{GeoMarker, MapError, MapTile, MAX_ZOOM};
use crate::{err, Config, Result};
use async_trait::async_trait;
use clap::Parser;

/// Show the map tile that contains the coordinates
#[derive(Parser, Debug)]
pub struct Tile {
    #[clap(allow_negative_numbers = true)]
    lat: f64,

    #[clap(allow_negative_numbers = true)]
    lng: f64,

    /// Zoom level, the configured one by default
    #[clap(long)]
    zoom: Option<u8>,
}

#[async_trait]
impl super::Cmd for Tile {
    async fn run(self, config: &Config) -> Result {
        let zoom = self.zoom.unwrap_or(config.map.zoom);
        if zoom > MAX_ZOOM {
            return Err(err!(MapError::InvalidZoom { zoom }));
        }

        let marker = GeoMarker::new(self.lat, self.lng);
        let tile = MapTile::containing(marker, zoom);
        let (x, y) = tile.offset_of(marker);

        println!("z={} x={} y={} offset=({x:.1}, {y:.1})", tile.zoom, tile.x, tile.y);

        Ok(())
    }
}
