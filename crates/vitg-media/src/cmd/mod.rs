mod lookup;
mod map;
mod preview;
mod sniff;
mod tile;

use crate::{Config, Result};
use async_trait::async_trait;
use clap::Parser;

/// Inspect and populate the media cache of the vi-tg chat client
#[derive(Parser, Debug)]
pub enum Args {
    Sniff(sniff::Sniff),
    Lookup(lookup::Lookup),
    Preview(preview::Preview),
    Tile(tile::Tile),
    Map(map::Map),
}

#[async_trait]
trait Cmd {
    async fn run(self, config: &Config) -> Result;
}

impl Args {
    pub async fn run(self, config: &Config) -> Result {
        match self {
            Args::Sniff(cmd) => cmd.run(config).await,
            Args::Lookup(cmd) => cmd.run(config).await,
            Args::Preview(cmd) => cmd.run(config).await,
            Args::Tile(cmd) => cmd.run(config).await,
            Args::Map(cmd) => cmd.run(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["vitg-media", "lookup", "sticker", "555"]).unwrap();
        expect_test::expect![[r#"Lookup(Lookup { kind: Sticker, id: 555 })"#]]
            .assert_eq(&format!("{args:?}"));

        let args =
            Args::try_parse_from(["vitg-media", "tile", "55.7558", "37.6173", "--zoom", "12"])
                .unwrap();
        expect_test::expect![[r#"Tile(Tile { lat: 55.7558, lng: 37.6173, zoom: Some(12) })"#]]
            .assert_eq(&format!("{args:?}"));
    }
}
