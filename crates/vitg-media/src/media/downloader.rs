use super::{
    detect_file, CacheEntry, CacheStore, ChunkedFetcher, FetchError, FileSource, MediaRef,
    SizeVariant,
};
use crate::prelude::*;
use crate::{err, Result};
use itertools::Itertools;
use std::cmp::Reverse;
use std::sync::Arc;

/// Downloads media of any kind into the [`CacheStore`].
///
/// The same loop serves every [`MediaKind`](super::MediaKind), the kind only
/// selects the chunk size, the canonical file name and the fallback
/// extension.
pub struct MediaDownloader {
    cache: CacheStore,
    source: Arc<dyn FileSource>,
}

impl MediaDownloader {
    pub fn new(cache: CacheStore, source: Arc<dyn FileSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Same as [`Self::try_download`], but the failure is only logged.
    /// `None` means the media is unavailable.
    pub async fn download(&self, media: &MediaRef) -> Option<CacheEntry> {
        self.try_download(media)
            .await
            .map_err(|err| {
                warn!(
                    kind = %media.kind,
                    id = media.id,
                    reference_expired = err.is_reference_expired(),
                    err = tracing_err(&err),
                    "Media is unavailable"
                );
            })
            .ok()
    }

    /// Returns the cached file for the media, downloading it on a miss.
    ///
    /// Photo variants are attempted from the widest to the narrowest, the
    /// ones with unknown width go last. The first variant that downloads
    /// successfully wins. An expired file reference stops the descent,
    /// because all variants share it.
    #[instrument(skip_all, fields(kind = %media.kind, id = media.id))]
    pub async fn try_download(&self, media: &MediaRef) -> Result<CacheEntry> {
        let kind_label = media.kind.path_segment();

        if let Some(entry) = self.cache.lookup(media.kind, media.id).await? {
            metrics::increment_counter!("vitg_media_cache_hits_total", "kind" => kind_label);
            trace!(path = %entry.path.display(), "Cache hit");
            return Ok(entry);
        }

        metrics::increment_counter!("vitg_media_cache_misses_total", "kind" => kind_label);

        let mut last_err = None;

        for variant in ordered_variants(&media.variants) {
            let (result, duration) = self.download_variant(media, variant).with_duration().await;

            let status = if result.is_ok() { "ok" } else { "err" };
            metrics::histogram!(
                "vitg_media_download_duration_seconds",
                duration,
                "kind" => kind_label,
                "status" => status
            );

            let err = match result {
                Ok(entry) => {
                    info!(
                        variant = %variant.label,
                        width = variant.width,
                        path = %entry.path.display(),
                        size = tracing_size(entry.size_bytes),
                        duration = tracing_duration(duration),
                        "Downloaded media"
                    );
                    return Ok(entry);
                }
                Err(err) => err,
            };

            if err.is_reference_expired() {
                return Err(err);
            }

            warn!(
                variant = %variant.label,
                width = variant.width,
                err = tracing_err(&err),
                "Failed to download the size variant"
            );

            last_err = Some(err);
        }

        Err(last_err.unwrap_or_else(|| err!(FetchError::NoLocations)))
    }

    async fn download_variant(&self, media: &MediaRef, variant: &SizeVariant) -> Result<CacheEntry> {
        // The temp file is removed if any of the steps below fails
        let (mut file, temp) = self.cache.create_temp_file(".part").await?;

        let fetcher = ChunkedFetcher::new(self.source.as_ref(), media.kind.chunk_size());
        let summary = fetcher.fetch(&variant.location, &mut file).await?;
        drop(file);

        // Lookup probes only the candidate extensions of the kind, so anything
        // else would never be found in the cache again
        let detected = detect_file(&temp)
            .await?
            .filter(|extension| media.kind.candidate_extensions().contains(extension));

        let extension = match detected {
            Some(extension) => extension,
            None => {
                let fallback = media.kind.fallback_extension(media.mime_type.as_deref());
                debug!(
                    mime_type = media.mime_type.as_deref(),
                    %fallback,
                    "Content format is not recognized, using the fallback extension"
                );
                fallback
            }
        };

        metrics::histogram!(
            "vitg_media_download_size_bytes",
            summary.total_bytes as f64,
            "kind" => media.kind.path_segment(),
            "via_cdn" => summary.via_cdn.to_string()
        );

        self.cache
            .publish(media.kind, media.id, temp, extension)
            .await
    }
}

fn ordered_variants(variants: &[SizeVariant]) -> impl Iterator<Item = &SizeVariant> {
    variants
        .iter()
        .sorted_by_key(|variant| (variant.width == 0, Reverse(variant.width)))
}
