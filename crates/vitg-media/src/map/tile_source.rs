use super::{MapConfig, MapError, MapTile};
use crate::http::{self, HttpClientError};
use crate::prelude::*;
use crate::{err, err_ctx, Result};
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// Source of raster map tiles
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Returns the encoded raster image of the tile
    async fn fetch_tile(&self, tile: MapTile) -> Result<Bytes>;
}

pub struct HttpTileSource {
    http: http::Client,
    url_template: String,
    api_key: String,
}

impl HttpTileSource {
    pub fn new(config: &MapConfig) -> Result<Self> {
        Ok(Self {
            http: http::create_client()?,
            url_template: config.tile_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn tile_url(&self, tile: MapTile) -> Result<Url> {
        let url = self
            .url_template
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{z}", &tile.zoom.to_string())
            .replace("{api_key}", &self.api_key);

        Url::parse(&url).map_err(|source| {
            // Don't leak the API key into the logs
            let url = self.url_template.clone();
            err!(MapError::InvalidTileUrl { url, source })
        })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    #[instrument(skip(self))]
    async fn fetch_tile(&self, tile: MapTile) -> Result<Bytes> {
        let url = self.tile_url(tile)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(err_ctx!(HttpClientError::Request))?;

        let status = response.status();

        // Anything other than 200 has no tile image in the body, e.g. 204
        if status != reqwest::StatusCode::OK {
            return Err(err!(MapError::BadTileStatus { tile, status }));
        }

        response
            .bytes()
            .await
            .map_err(err_ctx!(HttpClientError::ReadPayload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn tile_url_substitutes_placeholders() {
        let config = MapConfig {
            api_key: "secret-key".to_owned(),
            ..Default::default()
        };
        let source = HttpTileSource::new(&config).unwrap();

        let url = source
            .tile_url(MapTile {
                zoom: 15,
                x: 19808,
                y: 10272,
            })
            .unwrap();

        expect!["https://tiles.api-maps.yandex.ru/v1/tiles/?x=19808&y=10272&z=15&lang=ru_RU&l=map&apikey=secret-key"]
            .assert_eq(url.as_str());
    }

    #[test]
    fn invalid_template_hides_the_key() {
        let config = MapConfig {
            tile_url: "not a url {api_key}".to_owned(),
            api_key: "secret-key".to_owned(),
            ..Default::default()
        };
        let source = HttpTileSource::new(&config).unwrap();

        let err = source
            .tile_url(MapTile { zoom: 1, x: 0, y: 0 })
            .unwrap_err();

        assert!(!err.to_string().contains("secret-key"), "{err}");
    }
}
