//! Media acquisition and local cache pipeline of the `vi-tg` chat client.
//!
//! Turns opaque remote media references into byte-exact files in a local
//! disk cache, derives video previews from them and renders static location
//! maps.

mod cmd;
mod config;
mod error;
mod http;
mod observability;

pub mod auth_code;
pub mod map;
pub mod media;
pub mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::error::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

/// Runs the command passed via the command line arguments
pub async fn run(config: Config) -> Result {
    use clap::Parser;
    cmd::Args::parse().run(&config).await
}
