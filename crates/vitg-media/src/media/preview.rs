use super::{CacheStore, Extension};
use crate::prelude::*;
use crate::{err, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Timestamps of the frames we try to use as a preview, in order. Short
/// clips may not have a frame at the first one.
const FRAME_TIMESTAMPS: [Duration; 2] = [Duration::from_secs(1), Duration::from_millis(500)];

fn default_ffmpeg() -> String {
    "ffmpeg".to_owned()
}

fn default_min_size_bytes() -> u64 {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Program used to extract frames from videos
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Extracted frames smaller than this are considered broken
    #[serde(default = "default_min_size_bytes")]
    pub min_size_bytes: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            min_size_bytes: default_min_size_bytes(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(
        "Extracted frame at {at:?} is too small ({}, min: {})",
        human_size(*actual),
        human_size(*min)
    )]
    TooSmall { at: Duration, actual: u64, min: u64 },

    #[error("Failed to extract a preview frame at any of the timestamps {attempted:?}")]
    NoFrame { attempted: Vec<Duration> },
}

/// Produces a single still image from a video
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(&self, video: &Path, at: Duration, output: &Path) -> Result;
}

pub struct FfmpegExtractor {
    program: String,
}

impl FfmpegExtractor {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            program: config.ffmpeg.clone(),
        }
    }
}

fn ffmpeg_args(video: &Path, at: Duration, output: &Path) -> Vec<String> {
    let at = format!("{:.3}", at.as_secs_f64());
    let video = video.to_string_lossy();
    let output = output.to_string_lossy();

    // Rustfmt is doing a bad job of condensing this code, so let's disable it
    #[rustfmt::skip]
    let args: &[&str] = &[
        "-hide_banner",
        "-loglevel",
        "error",

        // Overwrite output file without interactive confirmation
        "-y",

        // Seeking before the input is fast, it jumps to the closest keyframe
        "-ss",
        &at,

        "-i",
        &video,

        "-frames:v",
        "1",

        // High JPEG quality, the scale is 2..31 where lower is better
        "-q:v",
        "2",

        &output,
    ];

    args.iter().copied().map(ToOwned::to_owned).collect()
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    #[instrument(skip(self), fields(video = %video.display()))]
    async fn extract_frame(&self, video: &Path, at: Duration, output: &Path) -> Result {
        let args = ffmpeg_args(video, at, output);
        let args: Vec<_> = args.iter().map(String::as_str).collect();

        crate::util::process::run(&self.program, &args).await?;

        Ok(())
    }
}

/// Preview frame of a cached video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArtifact {
    pub source_video_id: i64,
    pub path: PathBuf,

    /// Empty if the preview was already cached
    pub attempted_timestamps: Vec<Duration>,
}

pub struct PreviewGenerator {
    cache: CacheStore,
    extractor: Arc<dyn FrameExtractor>,
    min_size_bytes: u64,
}

impl PreviewGenerator {
    pub fn new(
        cache: CacheStore,
        extractor: Arc<dyn FrameExtractor>,
        config: &PreviewConfig,
    ) -> Self {
        Self {
            cache,
            extractor,
            min_size_bytes: config.min_size_bytes,
        }
    }

    pub fn preview_path(&self, video_id: i64) -> PathBuf {
        self.cache
            .artifact_path("video_preview", video_id, Extension::Jpg)
    }

    /// Same as [`Self::try_generate`], but the failure is only logged.
    /// Missing preview doesn't prevent the video from being shown.
    pub async fn generate(&self, video: &Path, video_id: i64) -> Option<PreviewArtifact> {
        self.try_generate(video, video_id)
            .await
            .map_err(|err| {
                warn!(
                    video_id,
                    err = tracing_err(&err),
                    "Video preview is unavailable"
                );
            })
            .ok()
    }

    /// Returns the cached preview or extracts a frame from the video. The
    /// frame at 1s is tried first, then the frame at 0.5s.
    #[instrument(skip(self), fields(video = %video.display()))]
    pub async fn try_generate(&self, video: &Path, video_id: i64) -> Result<PreviewArtifact> {
        let path = self.preview_path(video_id);

        if self.cache.probe(&path).await?.is_some() {
            return Ok(PreviewArtifact {
                source_video_id: video_id,
                path,
                attempted_timestamps: vec![],
            });
        }

        let mut attempted = Vec::with_capacity(FRAME_TIMESTAMPS.len());

        for at in FRAME_TIMESTAMPS {
            attempted.push(at);

            let result = self.attempt(video, at, &path).await;

            let status = if result.is_ok() { "ok" } else { "err" };
            metrics::increment_counter!("vitg_media_preview_attempts_total", "status" => status);

            match result {
                Ok(()) => {
                    info!(path = %path.display(), ?at, "Generated video preview");
                    return Ok(PreviewArtifact {
                        source_video_id: video_id,
                        path,
                        attempted_timestamps: attempted,
                    });
                }
                Err(err) => {
                    warn!(?at, err = tracing_err(&err), "Preview frame extraction failed");
                }
            }
        }

        Err(err!(PreviewError::NoFrame { attempted }))
    }

    async fn attempt(&self, video: &Path, at: Duration, path: &Path) -> Result {
        // The extension lets the tool infer the output format
        let (file, temp) = self.cache.create_temp_file(".jpg").await?;
        drop(file);

        self.extractor.extract_frame(video, at, &temp).await?;

        let actual = fs_err::tokio::metadata(&*temp).await?.len();
        let min = self.min_size_bytes;

        if actual < min {
            return Err(err!(PreviewError::TooSmall { at, actual, min }));
        }

        self.cache.persist(temp, path).await?;

        Ok(())
    }
}
