use crate::map::{GeoMarker, HttpTileSource, MapCompositor};
use crate::media::CacheStore;
use crate::{Config, Result};
use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;

/// Render the map of a location into the cache
#[derive(Parser, Debug)]
pub struct Map {
    /// Id of the location message
    #[clap(allow_negative_numbers = true)]
    id: i64,

    #[clap(allow_negative_numbers = true)]
    lat: f64,

    #[clap(allow_negative_numbers = true)]
    lng: f64,
}

#[async_trait]
impl super::Cmd for Map {
    async fn run(self, config: &Config) -> Result {
        let compositor = MapCompositor::new(
            CacheStore::new(config.cache.clone()),
            Arc::new(HttpTileSource::new(&config.map)?),
            &config.map,
        )?;

        let path = compositor
            .try_render(self.id, GeoMarker::new(self.lat, self.lng))
            .await?;

        println!("{}", path.display());

        Ok(())
    }
}
