use super::{GeoMarker, MapConfig, MapError, MapTile, TileSource, MAX_ZOOM};
use crate::media::{CacheStore, Extension};
use crate::prelude::*;
use crate::util::tokio::spawn_blocking;
use crate::{err, err_ctx, Result};
use image::{imageops, DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub const CANVAS_WIDTH: u32 = 400;
pub const CANVAS_HEIGHT: u32 = 300;

const MARKER_RADIUS: i64 = 10;
const MARKER_RING_WIDTH: i64 = 2;
const MARKER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const MARKER_RING_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([100, 150, 200, 255]);
const PLACEHOLDER_MARKER_RADIUS: i64 = 5;

/// Renders a fixed-size map of a location with a marker at its coordinates.
pub struct MapCompositor {
    cache: CacheStore,
    tiles: Arc<dyn TileSource>,
    zoom: u8,
}

impl MapCompositor {
    pub fn new(cache: CacheStore, tiles: Arc<dyn TileSource>, config: &MapConfig) -> Result<Self> {
        let zoom = config.zoom;
        if zoom > MAX_ZOOM {
            return Err(err!(MapError::InvalidZoom { zoom }));
        }

        Ok(Self { cache, tiles, zoom })
    }

    pub fn map_path(&self, location_id: i64) -> PathBuf {
        self.cache
            .artifact_path("location_map", location_id, Extension::Png)
    }

    /// Composes the map from the tile that contains the marker. If the tile
    /// can't be fetched or decoded a placeholder is returned instead, so
    /// this never fails.
    #[instrument(skip(self))]
    pub async fn compose(&self, marker: GeoMarker) -> RgbaImage {
        match self.try_compose(marker).await {
            Ok(image) => image,
            Err(err) => {
                warn!(err = tracing_err(&err), "Map tile is unavailable, using a placeholder");
                metrics::increment_counter!("vitg_map_placeholders_total");
                placeholder()
            }
        }
    }

    async fn try_compose(&self, marker: GeoMarker) -> Result<RgbaImage> {
        let tile = MapTile::containing(marker, self.zoom);

        let bytes = self
            .tiles
            .fetch_tile(tile)
            .with_duration_log("Fetched map tile")
            .await?;

        let raster = spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(err_ctx!(MapError::DecodeTile { tile }))?
            .to_rgba8();

        Ok(compose_with_tile(&raster, tile.offset_of(marker)))
    }

    /// Same as [`Self::try_render`], but the failure is only logged
    pub async fn render(&self, location_id: i64, marker: GeoMarker) -> Option<PathBuf> {
        self.try_render(location_id, marker)
            .await
            .map_err(|err| {
                warn!(
                    location_id,
                    err = tracing_err(&err),
                    "Location map is unavailable"
                );
            })
            .ok()
    }

    /// Returns the path of the cached PNG map of the location, rendering it
    /// if it doesn't exist yet.
    #[instrument(skip(self))]
    pub async fn try_render(&self, location_id: i64, marker: GeoMarker) -> Result<PathBuf> {
        let path = self.map_path(location_id);

        if self.cache.probe(&path).await?.is_some() {
            return Ok(path);
        }

        let image = self.compose(marker).await;
        let png = spawn_blocking(move || encode_png(image)).await?;

        let (mut file, temp) = self.cache.create_temp_file(".png").await?;
        file.write_all(&png).await?;
        file.flush().await?;
        drop(file);

        self.cache.persist(temp, &path).await?;

        info!(
            path = %path.display(),
            size = tracing_size(png.len() as u64),
            "Rendered location map"
        );

        Ok(path)
    }
}

/// Puts the tile in the center of the canvas and draws the marker on top of
/// it. `marker_offset` is the position of the marker relative to the
/// top-left corner of the tile.
pub fn compose_with_tile(tile: &RgbaImage, marker_offset: (f64, f64)) -> RgbaImage {
    let mut canvas = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);

    let left = (i64::from(CANVAS_WIDTH) - i64::from(tile.width())) / 2;
    let top = (i64::from(CANVAS_HEIGHT) - i64::from(tile.height())) / 2;

    imageops::replace(&mut canvas, tile, left, top);

    let (offset_x, offset_y) = marker_offset;
    let center = (
        left + offset_x.floor() as i64,
        top + offset_y.floor() as i64,
    );

    fill_ring(&mut canvas, center, None, MARKER_RADIUS, MARKER_COLOR);
    fill_ring(
        &mut canvas,
        center,
        Some(MARKER_RADIUS),
        MARKER_RADIUS + MARKER_RING_WIDTH,
        MARKER_RING_COLOR,
    );

    canvas
}

/// Solid canvas of the same size as the real map with a dot in its center
pub fn placeholder() -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, PLACEHOLDER_COLOR);

    let center = (
        i64::from(CANVAS_WIDTH / 2),
        i64::from(CANVAS_HEIGHT / 2),
    );
    fill_ring(&mut canvas, center, None, PLACEHOLDER_MARKER_RADIUS, MARKER_COLOR);

    canvas
}

/// Paints the pixels whose distance from the center is in `(inner, outer]`,
/// or `[0, outer]` if there is no inner radius. Pixels outside of the canvas
/// are skipped.
fn fill_ring(
    canvas: &mut RgbaImage,
    (center_x, center_y): (i64, i64),
    inner: Option<i64>,
    outer: i64,
    color: Rgba<u8>,
) {
    let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));

    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let distance = dx * dx + dy * dy;

            if distance > outer * outer || inner.is_some_and(|inner| distance <= inner * inner) {
                continue;
            }

            let (x, y) = (center_x + dx, center_y + dy);

            if (0..width).contains(&x) && (0..height).contains(&y) {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .map_err(err_ctx!(MapError::Encode))?;
    Ok(buf)
}
