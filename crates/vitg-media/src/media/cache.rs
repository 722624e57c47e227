use super::{CacheEntry, Extension, MediaKind};
use crate::prelude::*;
use crate::util::tokio::spawn_blocking;
use crate::{err, err_ctx, Result};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

fn default_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_prefix() -> String {
    "vi-tg".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory where all cached files and derived artifacts live
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Application prefix of every file name in the cache directory
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to inspect a file in the cache")]
    Inspect { source: io::Error },

    #[error("Failed to remove an empty cache entry")]
    RemoveEmpty { source: io::Error },

    #[error("Failed to create a temp file in the cache directory {dir:?}")]
    CreateTempFile { dir: PathBuf, source: io::Error },

    #[error("Refusing to publish an empty file to {path:?}")]
    EmptyFile { path: PathBuf },

    #[error("Failed to publish the file to {path:?}")]
    Publish { path: PathBuf, source: io::Error },
}

/// Flat directory of files named `<prefix>_<segment>_<id>.<ext>`.
///
/// The path is the only index. There is no eviction, the files live until
/// the OS cleans up the temp directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    prefix: String,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            root: config.dir,
            prefix: config.prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn canonical_path(&self, kind: MediaKind, id: i64, extension: Extension) -> PathBuf {
        self.artifact_path(kind.path_segment(), id, extension)
    }

    /// Path of a file derived from some object, e.g. `video_preview` or
    /// `location_map`.
    pub fn artifact_path(&self, segment: &str, id: i64, extension: Extension) -> PathBuf {
        self.root
            .join(format!("{}_{segment}_{id}.{extension}", self.prefix))
    }

    /// Probes the candidate extensions of the kind in order and returns the
    /// first non-empty file. Empty files are deleted on the way.
    #[instrument(skip(self))]
    pub async fn lookup(&self, kind: MediaKind, id: i64) -> Result<Option<CacheEntry>> {
        for &extension in kind.candidate_extensions() {
            let path = self.canonical_path(kind, id, extension);

            let Some(size_bytes) = self.probe(&path).await? else {
                continue;
            };

            return Ok(Some(CacheEntry {
                kind,
                id,
                extension,
                path,
                size_bytes,
            }));
        }

        Ok(None)
    }

    /// Returns the size of the file at `path` if it exists and is not empty.
    /// An existing empty file is never a hit, so it is removed.
    pub(crate) async fn probe(&self, path: &Path) -> Result<Option<u64>> {
        let metadata = match fs_err::tokio::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(err!(CacheError::Inspect { source })),
        };

        if !metadata.is_file() {
            return Ok(None);
        }

        let size = metadata.len();
        if size > 0 {
            return Ok(Some(size));
        }

        warn!(path = %path.display(), "Removing an empty cache entry");

        match fs_err::tokio::remove_file(path).await {
            Ok(()) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(err!(CacheError::RemoveEmpty { source })),
        }
    }

    /// Creates a uniquely named temp file in the cache directory. It is
    /// removed when the returned [`TempPath`] is dropped without being
    /// persisted. Temp files never collide with the canonical names.
    pub(crate) async fn create_temp_file(
        &self,
        suffix: &str,
    ) -> Result<(tokio::fs::File, TempPath)> {
        let dir = self.root.clone();
        let prefix = format!(".{}_", self.prefix);
        let suffix = suffix.to_owned();

        let file = spawn_blocking(move || {
            fs_err::create_dir_all(&dir)?;
            tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(&suffix)
                .tempfile_in(&dir)
        })
        .await
        .map_err(err_ctx!(CacheError::CreateTempFile {
            dir: self.root.clone()
        }))?;

        let (file, path) = file.into_parts();

        Ok((tokio::fs::File::from_std(file), path))
    }

    /// Atomically moves the fully written temp file to the canonical path
    #[instrument(skip(self, temp))]
    pub async fn publish(
        &self,
        kind: MediaKind,
        id: i64,
        temp: TempPath,
        extension: Extension,
    ) -> Result<CacheEntry> {
        let path = self.canonical_path(kind, id, extension);
        let size_bytes = self.persist(temp, &path).await?;

        debug!(
            path = %path.display(),
            size = tracing_size(size_bytes),
            "Published a cache entry"
        );

        Ok(CacheEntry {
            kind,
            id,
            extension,
            path,
            size_bytes,
        })
    }

    /// Renames the temp file to `path` and returns its size. Readers of
    /// `path` observe either nothing or the complete file. On failure the
    /// temp file is removed.
    pub(crate) async fn persist(&self, temp: TempPath, path: &Path) -> Result<u64> {
        let size = fs_err::tokio::metadata(&*temp)
            .await
            .map_err(err_ctx!(CacheError::Inspect))?
            .len();

        if size == 0 {
            return Err(err!(CacheError::EmptyFile {
                path: path.to_owned()
            }));
        }

        let dest = path.to_owned();

        // The temp path inside of the error is dropped here, which removes the file
        spawn_blocking(move || temp.persist(dest))
            .await
            .map_err(|err| {
                err!(CacheError::Publish {
                    path: path.to_owned(),
                    source: err.error,
                })
            })?;

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::cache_store as store;
    use assert_matches::assert_matches;
    use expect_test::expect;
    use tokio::io::AsyncWriteExt;

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn canonical_paths() {
        let store = store(Path::new("/tmp"));

        let names = [
            store.canonical_path(MediaKind::Sticker, 555, Extension::Webp),
            store.canonical_path(MediaKind::Photo, 1, Extension::Jpg),
            store.canonical_path(MediaKind::Voice, -3, Extension::Ogg),
            store.artifact_path("video_preview", 9, Extension::Jpg),
            store.artifact_path("location_map", 10, Extension::Png),
        ]
        .map(|path| file_name(&path));

        expect![[r#"
            [
                "vi-tg_sticker_555.webp",
                "vi-tg_image_1.jpg",
                "vi-tg_voice_-3.ogg",
                "vi-tg_video_preview_9.jpg",
                "vi-tg_location_map_10.png",
            ]
        "#]]
        .assert_debug_eq(&names);
    }

    #[test_log::test(tokio::test)]
    async fn lookup_probes_candidates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert_eq!(store.lookup(MediaKind::Sticker, 7).await.unwrap(), None);

        fs_err::write(dir.path().join("vi-tg_sticker_7.jpg"), b"jpg").unwrap();
        fs_err::write(dir.path().join("vi-tg_sticker_7.png"), b"png!").unwrap();

        let entry = store.lookup(MediaKind::Sticker, 7).await.unwrap().unwrap();

        assert_eq!(entry.extension, Extension::Png);
        assert_eq!(entry.size_bytes, 4);
        assert_eq!(file_name(&entry.path), "vi-tg_sticker_7.png");

        // Other kinds with the same id are separate entries
        assert_eq!(store.lookup(MediaKind::Photo, 7).await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn empty_entries_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let empty = dir.path().join("vi-tg_video_3.mp4");
        fs_err::write(&empty, b"").unwrap();
        fs_err::write(dir.path().join("vi-tg_video_3.mkv"), b"matroska").unwrap();

        let entry = store.lookup(MediaKind::Video, 3).await.unwrap().unwrap();

        assert_eq!(entry.extension, Extension::Mkv);
        assert!(!empty.exists());
    }

    #[test_log::test(tokio::test)]
    async fn publish_moves_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let (mut file, temp) = store.create_temp_file(".part").await.unwrap();
        file.write_all(b"RIFF....WEBP").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let temp_path = temp.to_path_buf();

        // Temp files are never visible to lookups
        assert_eq!(store.lookup(MediaKind::Sticker, 1).await.unwrap(), None);

        let entry = store
            .publish(MediaKind::Sticker, 1, temp, Extension::Webp)
            .await
            .unwrap();

        assert!(!temp_path.exists());
        assert_eq!(fs_err::read(&entry.path).unwrap(), b"RIFF....WEBP");
        assert_eq!(
            store.lookup(MediaKind::Sticker, 1).await.unwrap(),
            Some(entry)
        );
    }

    #[test_log::test(tokio::test)]
    async fn empty_temp_file_is_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let (_, temp) = store.create_temp_file(".part").await.unwrap();
        let temp_path = temp.to_path_buf();

        let err = store
            .publish(MediaKind::Audio, 2, temp, Extension::Mp3)
            .await
            .unwrap_err();

        assert_matches!(
            err.kind(),
            crate::ErrorKind::Cache {
                source: CacheError::EmptyFile { .. }
            }
        );
        assert!(!temp_path.exists());
        assert!(!store
            .canonical_path(MediaKind::Audio, 2, Extension::Mp3)
            .exists());
    }

    #[test_log::test(tokio::test)]
    async fn temp_files_are_created_in_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let store = store(&root);

        let (_, temp) = store.create_temp_file(".jpg").await.unwrap();

        assert!(temp.starts_with(&root));
        assert!(file_name(&temp).ends_with(".jpg"));
    }
}
