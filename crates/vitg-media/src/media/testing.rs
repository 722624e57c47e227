//! In-memory [`FileSource`] used by the tests of the media pipeline.

use super::{
    CdnFileResponse, CdnToken, FileLocation, FileResponse, FileSource, RemoteError,
    FILE_REFERENCE_EXPIRED,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Origin {
        variant: String,
        offset: i64,
        limit: usize,
    },
    Cdn {
        offset: i64,
        limit: usize,
    },
}

pub(crate) enum Blob {
    Content(Bytes),
    Expired,
    Broken,
    /// Serves the content until the offset, then the connection breaks
    BrokenAt { content: Bytes, offset: i64 },
    Unrecognized,
}

/// Serves blobs keyed by the variant of the location: `document` for
/// documents and the thumb size for photos.
#[derive(Default)]
pub(crate) struct FakeRemote {
    blobs: HashMap<String, Blob>,
    cdn_from_offset: Option<i64>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRemote {
    pub(crate) fn with_blob(mut self, variant: &str, blob: Blob) -> Self {
        self.blobs.insert(variant.to_owned(), blob);
        self
    }

    pub(crate) fn with_document(self, content: impl Into<Bytes>) -> Self {
        self.with_blob("document", Blob::Content(content.into()))
    }

    /// Origin reads at or past the offset are redirected to the CDN
    pub(crate) fn redirect_to_cdn_from(mut self, offset: i64) -> Self {
        self.cdn_from_offset = Some(offset);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn blob(&self, key: &str) -> Result<&Blob, RemoteError> {
        self.blobs.get(key).ok_or_else(|| RemoteError::Rpc {
            code: 400,
            name: "LOCATION_INVALID".to_owned(),
        })
    }
}

pub(crate) fn variant_key(location: &FileLocation) -> String {
    match location {
        FileLocation::Document { .. } => "document".to_owned(),
        FileLocation::Photo { thumb_size, .. } => thumb_size.clone(),
    }
}

/// Deterministic payload of the given length that starts with `header`
pub(crate) fn payload(header: &[u8], len: usize) -> Bytes {
    let mut bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    let header_len = header.len().min(len);
    bytes[..header_len].copy_from_slice(&header[..header_len]);
    bytes.into()
}

fn slice(content: &Bytes, offset: i64, limit: usize) -> Bytes {
    let start = (offset as usize).min(content.len());
    let end = (start + limit).min(content.len());
    content.slice(start..end)
}

fn respond(blob: &Blob, offset: i64, limit: usize) -> Result<Bytes, RemoteError> {
    match blob {
        Blob::Content(content) => Ok(slice(content, offset, limit)),
        Blob::Expired => Err(RemoteError::Rpc {
            code: 400,
            name: FILE_REFERENCE_EXPIRED.to_owned(),
        }),
        Blob::BrokenAt {
            content,
            offset: broken_at,
        } if offset < *broken_at => Ok(slice(content, offset, limit)),
        Blob::Broken | Blob::BrokenAt { .. } => Err(RemoteError::Transport {
            source: "connection reset".into(),
        }),
        Blob::Unrecognized => unreachable!("handled by the caller"),
    }
}

#[async_trait]
impl FileSource for FakeRemote {
    async fn get_file(
        &self,
        location: &FileLocation,
        offset: i64,
        limit: usize,
    ) -> Result<FileResponse, RemoteError> {
        let variant = variant_key(location);

        self.calls.lock().push(Call::Origin {
            variant: variant.clone(),
            offset,
            limit,
        });

        let blob = self.blob(&variant)?;

        if let Blob::Unrecognized = blob {
            return Ok(FileResponse::Unrecognized("upload.fileUnknown".to_owned()));
        }

        if self.cdn_from_offset.is_some_and(|from| offset >= from) {
            return Ok(FileResponse::CdnRedirect(CdnToken(Bytes::from(variant))));
        }

        respond(blob, offset, limit).map(FileResponse::Chunk)
    }

    async fn get_cdn_file(
        &self,
        token: &CdnToken,
        offset: i64,
        limit: usize,
    ) -> Result<CdnFileResponse, RemoteError> {
        self.calls.lock().push(Call::Cdn { offset, limit });

        let variant = String::from_utf8_lossy(&token.0).into_owned();
        let blob = self.blob(&variant)?;

        respond(blob, offset, limit).map(CdnFileResponse::Chunk)
    }
}

pub(crate) fn cache_store(dir: &std::path::Path) -> super::CacheStore {
    super::CacheStore::new(super::CacheConfig {
        dir: dir.to_owned(),
        prefix: "vi-tg".to_owned(),
    })
}
