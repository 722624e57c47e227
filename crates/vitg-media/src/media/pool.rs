use super::{CacheEntry, MediaDownloader, MediaKind, MediaRef};
use crate::prelude::*;
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

fn default_max_concurrent() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Max number of downloads that may be in flight at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Bounds the number of simultaneous downloads and serializes the requests
/// for the same `(kind, id)`, so that only the first one goes to the network
/// and the rest observe a cache hit.
pub struct DownloadPool {
    downloader: MediaDownloader,
    limiter: Semaphore,
    in_flight: parking_lot::Mutex<HashMap<(MediaKind, i64), KeyLock>>,
}

impl DownloadPool {
    pub fn new(downloader: MediaDownloader, config: &DownloadConfig) -> Self {
        Self {
            downloader,
            limiter: Semaphore::new(config.max_concurrent.max(1)),
            in_flight: Default::default(),
        }
    }

    pub fn downloader(&self) -> &MediaDownloader {
        &self.downloader
    }

    pub async fn download(&self, media: &MediaRef) -> Option<CacheEntry> {
        self.try_download(media)
            .await
            .map_err(|err| {
                warn!(
                    kind = %media.kind,
                    id = media.id,
                    err = tracing_err(&err),
                    "Media is unavailable"
                );
            })
            .ok()
    }

    pub async fn try_download(&self, media: &MediaRef) -> Result<CacheEntry> {
        let key = (media.kind, media.id);
        let key_lock = self.in_flight.lock().entry(key).or_default().clone();

        // Runs on completion and on cancellation alike
        let _in_flight_guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
            key_lock: &key_lock,
        };

        let _key_guard = key_lock.lock().await;

        let _permit = self
            .limiter
            .acquire()
            .await
            .fatal_ctx(|| "BUG: download limiter was closed")?;

        metrics::increment_gauge!("vitg_media_downloads_in_flight", 1.0);
        let result = self.downloader.try_download(media).await;
        metrics::decrement_gauge!("vitg_media_downloads_in_flight", 1.0);

        result
    }

    /// Downloads the batch concurrently within the pool's bound. The output
    /// is in the same order as the input.
    pub async fn download_all(&self, media: &[MediaRef]) -> Vec<Option<CacheEntry>> {
        futures::future::join_all(media.iter().map(|media| self.download(media))).await
    }
}

/// Removes the entry of the key from the in-flight map when the last request
/// for the key finishes
struct InFlightGuard<'a> {
    in_flight: &'a parking_lot::Mutex<HashMap<(MediaKind, i64), KeyLock>>,
    key: (MediaKind, i64),
    key_lock: &'a KeyLock,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        // The map and this request hold the only references, so nobody waits
        if Arc::strong_count(self.key_lock) == 2 {
            in_flight.remove(&self.key);
        }
    }
}
