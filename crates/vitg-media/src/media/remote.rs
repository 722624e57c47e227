//! Interface of the remote file-read API consumed by the [`ChunkedFetcher`].
//!
//! The chat protocol client implements [`FileSource`]; this crate never
//! speaks the protocol itself.
//!
//! [`ChunkedFetcher`]: super::ChunkedFetcher

use crate::util::DynError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Name of the remote error that signals the file reference is stale
pub const FILE_REFERENCE_EXPIRED: &str = "FILE_REFERENCE_EXPIRED";

/// Address of a remote blob: object id, access credential and the file
/// reference that may expire.
#[derive(Clone, PartialEq, Eq)]
pub enum FileLocation {
    Document {
        id: i64,
        access_hash: i64,
        file_reference: Bytes,
    },
    Photo {
        id: i64,
        access_hash: i64,
        file_reference: Bytes,
        /// Type of the size variant, empty for the full-size progressive photo
        thumb_size: String,
    },
}

impl FileLocation {
    pub fn id(&self) -> i64 {
        match self {
            Self::Document { id, .. } | Self::Photo { id, .. } => *id,
        }
    }

    pub fn file_reference(&self) -> &Bytes {
        match self {
            Self::Document { file_reference, .. } | Self::Photo { file_reference, .. } => {
                file_reference
            }
        }
    }
}

// Access hashes and file references are credentials, they must not leak into logs
impl fmt::Debug for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document { id, .. } => f.debug_struct("Document").field("id", id).finish(),
            Self::Photo { id, thumb_size, .. } => f
                .debug_struct("Photo")
                .field("id", id)
                .field("thumb_size", thumb_size)
                .finish(),
        }
    }
}

/// Token issued by the remote to continue reading the file from a CDN
#[derive(Clone, PartialEq, Eq)]
pub struct CdnToken(pub Bytes);

impl fmt::Debug for CdnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CdnToken({} bytes)", self.0.len())
    }
}

/// Response to a ranged read of the original file location
#[derive(Debug, Clone)]
pub enum FileResponse {
    /// Chunk of the file starting at the requested offset. Possibly empty.
    Chunk(Bytes),

    /// The rest of the file has to be read from the CDN with this token
    CdnRedirect(CdnToken),

    /// Response of a shape that the fetcher doesn't know how to handle.
    /// The payload is the name of the response type for diagnostics.
    Unrecognized(String),
}

/// Response to a ranged read from the CDN
#[derive(Debug, Clone)]
pub enum CdnFileResponse {
    /// Chunk of the file starting at the requested offset. Possibly empty.
    Chunk(Bytes),

    /// Response of a shape that the fetcher doesn't know how to handle
    Unrecognized(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The remote rejected the request with the given error name
    #[error("Remote error {code}: {name}")]
    Rpc { code: i32, name: String },

    #[error("Transport failure")]
    Transport { source: Box<DynError> },
}

impl RemoteError {
    pub fn is_file_reference_expired(&self) -> bool {
        matches!(self, Self::Rpc { name, .. } if name.starts_with(FILE_REFERENCE_EXPIRED))
    }
}

/// Ranged-read API of the remote chat service.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read at most `limit` bytes of the file at `location` starting at `offset`
    async fn get_file(
        &self,
        location: &FileLocation,
        offset: i64,
        limit: usize,
    ) -> Result<FileResponse, RemoteError>;

    /// Read at most `limit` bytes of the CDN-hosted file starting at `offset`
    async fn get_cdn_file(
        &self,
        token: &CdnToken,
        offset: i64,
        limit: usize,
    ) -> Result<CdnFileResponse, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_reference_expired_is_distinguishable() {
        let expired = RemoteError::Rpc {
            code: 400,
            name: FILE_REFERENCE_EXPIRED.to_owned(),
        };
        assert!(expired.is_file_reference_expired());

        // Some errors have a suffix with the index of the failed location
        let expired = RemoteError::Rpc {
            code: 400,
            name: "FILE_REFERENCE_EXPIRED_0".to_owned(),
        };
        assert!(expired.is_file_reference_expired());

        let other = RemoteError::Rpc {
            code: 400,
            name: "LOCATION_INVALID".to_owned(),
        };
        assert!(!other.is_file_reference_expired());
    }

    #[test]
    fn credentials_are_not_printed() {
        let location = FileLocation::Document {
            id: 1,
            access_hash: 777_777,
            file_reference: Bytes::from_static(b"secret"),
        };
        let debug = format!("{location:?}");
        assert_eq!(debug, "Document { id: 1 }");
    }
}
