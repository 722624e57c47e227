use crate::media::{CacheStore, MediaKind};
use crate::prelude::*;
use crate::{Config, Result};
use async_trait::async_trait;
use clap::Parser;

/// Find the cached file of the media
#[derive(Parser, Debug)]
pub struct Lookup {
    #[clap(value_enum)]
    kind: MediaKind,

    /// Remote id of the media
    #[clap(allow_negative_numbers = true)]
    id: i64,
}

#[async_trait]
impl super::Cmd for Lookup {
    async fn run(self, config: &Config) -> Result {
        let cache = CacheStore::new(config.cache.clone());

        let Some(entry) = cache.lookup(self.kind, self.id).await? else {
            println!("miss");
            return Ok(());
        };

        println!(
            "{} ({}, {})",
            entry.path.display(),
            entry.content_type(),
            human_size(entry.size_bytes)
        );

        Ok(())
    }
}
