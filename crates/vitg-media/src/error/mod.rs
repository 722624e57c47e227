mod ext;
mod macros;

use crate::prelude::*;
use crate::util::DynError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing_error::SpanTrace;

pub(crate) use macros::*;

pub(crate) mod prelude {
    pub(crate) use super::ext::ResultExt as _;
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Describes any possible error that may happen in the media pipeline.
#[derive(Clone)]
pub struct Error {
    imp: Arc<ErrorImp>,
}

struct ErrorImp {
    /// Small identifier used for debugging purposes.
    /// It lets us find the logs that belong to a "media unavailable"
    /// placeholder shown in the UI.
    id: String,
    kind: ErrorKind,

    // Participates only in debug impl
    spantrace: SpanTrace,
}

#[derive(Error, Debug)]
pub(crate) enum ErrorKind {
    #[error(transparent)]
    Fetch {
        #[from]
        source: crate::media::FetchError,
    },

    #[error(transparent)]
    Cache {
        #[from]
        source: crate::media::CacheError,
    },

    #[error(transparent)]
    Preview {
        #[from]
        source: crate::media::PreviewError,
    },

    #[error(transparent)]
    Map {
        #[from]
        source: crate::map::MapError,
    },

    #[error(transparent)]
    AuthCode {
        #[from]
        source: crate::auth_code::AuthCodeError,
    },

    #[error(transparent)]
    HttpClient {
        #[from]
        source: crate::http::HttpClientError,
    },

    #[error(transparent)]
    Io {
        #[from]
        source: IoError,
    },

    /// Unrecoverable kind of error, that is not supposed to happen, but when
    /// it happens we can't do anything reasonable about it, so no structural
    /// error handling is possible, this error is just propagated to the top.
    #[error("FATAL: {message}")]
    Fatal {
        message: String,
        source: Option<Box<DynError>>,
    },
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io { source: err.into() }
    }
}

/// Filesystem errors that don't belong to any specific cache operation
#[derive(Debug, Error)]
#[error(transparent)]
pub(crate) struct IoError {
    #[from]
    source: std::io::Error,
}

impl Error {
    pub fn id(&self) -> &str {
        &self.imp.id
    }

    /// The remote refused the file reference of the media. The caller has to
    /// re-fetch the message metadata to get a fresh reference and retry.
    pub fn is_reference_expired(&self) -> bool {
        matches!(
            &self.imp.kind,
            ErrorKind::Fetch {
                source: crate::media::FetchError::ReferenceExpired { .. }
            }
        )
    }

    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.imp.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error (id: {}): {}", self.imp.id, self.imp.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.imp.kind.source()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)?;
        fmt::Display::fmt(&self.imp.spantrace, f)
    }
}

impl<T: Into<ErrorKind>> From<T> for Error {
    #[track_caller]
    fn from(kind: T) -> Self {
        let imp = ErrorImp {
            kind: kind.into(),
            id: nanoid::nanoid!(6),
            spantrace: SpanTrace::capture(),
        };

        let err = Self { imp: Arc::new(imp) };

        trace!(err = tracing_err(&err), "Created an error");

        err
    }
}
