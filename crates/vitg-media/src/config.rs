use crate::map::MapConfig;
use crate::media::{CacheConfig, DownloadConfig, PreviewConfig};
use serde::de::DeserializeOwned;

pub struct Config {
    pub cache: CacheConfig,
    pub download: DownloadConfig,
    pub preview: PreviewConfig,
    pub map: MapConfig,
}

impl Config {
    pub fn load_or_panic() -> Config {
        Self {
            cache: from_env_or_panic("VITG_CACHE_"),
            download: from_env_or_panic("VITG_DOWNLOAD_"),
            preview: from_env_or_panic("VITG_PREVIEW_"),
            map: from_env_or_panic("VITG_MAP_"),
        }
    }
}

pub(crate) fn from_env_or_panic<T: DeserializeOwned>(prefix: &str) -> T {
    envy::prefixed(prefix).from_env().unwrap_or_else(|err| {
        panic!(
            "BUG: Couldn't load config from environment for {}: {:#?}",
            std::any::type_name::<T>(),
            err
        );
    })
}
