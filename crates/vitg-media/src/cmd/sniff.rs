use crate::media;
use crate::{Config, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;

/// Detect the image format of a file by its content
#[derive(Parser, Debug)]
pub struct Sniff {
    file: PathBuf,
}

#[async_trait]
impl super::Cmd for Sniff {
    async fn run(self, _config: &Config) -> Result {
        match media::detect_file(&self.file).await? {
            Some(ext) => println!("{ext} ({})", ext.content_type()),
            None => println!("unknown"),
        }
        Ok(())
    }
}
