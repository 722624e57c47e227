//! Turns remote media references into files in the local disk cache.
//!
//! The [`MediaDownloader`] consults the [`CacheStore`] first, and only on a
//! miss drives the [`ChunkedFetcher`] into a temp file, sniffs the real
//! container format and publishes the file under its canonical path.

mod cache;
mod downloader;
mod fetch;
mod model;
mod pool;
mod preview;
mod remote;
mod sniff;

#[cfg(test)]
mod testing;

pub use cache::*;
pub use downloader::*;
pub use fetch::*;
pub use model::*;
pub use pool::*;
pub use preview::*;
pub use remote::*;
pub use sniff::*;
