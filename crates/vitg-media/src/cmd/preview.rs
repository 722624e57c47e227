use crate::media::{CacheStore, FfmpegExtractor, PreviewGenerator};
use crate::{Config, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Extract a preview frame from a video into the cache
#[derive(Parser, Debug)]
pub struct Preview {
    video: PathBuf,

    /// Remote id of the video
    #[clap(allow_negative_numbers = true)]
    id: i64,
}

#[async_trait]
impl super::Cmd for Preview {
    async fn run(self, config: &Config) -> Result {
        let generator = PreviewGenerator::new(
            CacheStore::new(config.cache.clone()),
            Arc::new(FfmpegExtractor::new(&config.preview)),
            &config.preview,
        );

        let preview = generator.try_generate(&self.video, self.id).await?;

        println!("{}", preview.path.display());

        Ok(())
    }
}
