use super::{CdnFileResponse, CdnToken, FileLocation, FileResponse, FileSource, RemoteError};
use crate::prelude::*;
use crate::{err, err_ctx, fatal, Result};
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("File reference has expired (offset: {offset}), the media must be re-fetched")]
    ReferenceExpired { offset: i64, source: RemoteError },

    #[error("Ranged read failed (offset: {offset})")]
    Remote { offset: i64, source: RemoteError },

    #[error("Unexpected response to a ranged read (offset: {offset}): {shape}")]
    UnexpectedResponse { offset: i64, shape: String },

    #[error("Failed to write the downloaded chunk to the temp file")]
    Write { source: std::io::Error },

    #[error("No remote locations are known for the media")]
    NoLocations,
}

/// States of a single fetch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// Reading from the original file location
    Fetching,

    /// Reading from the CDN with the token issued by the remote
    CdnRedirected(CdnToken),

    Done,
    Failed,
}

/// Ephemeral state of one fetch loop. The offset strictly increases with
/// every accepted chunk.
#[derive(Debug)]
pub struct DownloadSession<'a> {
    location: &'a FileLocation,
    offset: i64,
    chunk_size: usize,
    total_bytes: u64,
    reads: u32,
    via_cdn: bool,
    state: FetchState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub total_bytes: u64,

    /// Number of ranged reads that returned data (possibly empty)
    pub reads: u32,

    pub via_cdn: bool,
}

impl<'a> DownloadSession<'a> {
    fn new(location: &'a FileLocation, chunk_size: usize) -> Self {
        Self {
            location,
            offset: 0,
            chunk_size,
            total_bytes: 0,
            reads: 0,
            via_cdn: false,
            state: FetchState::Fetching,
        }
    }

    fn remote_error(&self, source: RemoteError) -> crate::Error {
        let offset = self.offset;
        if source.is_file_reference_expired() {
            return err!(FetchError::ReferenceExpired { offset, source });
        }
        err!(FetchError::Remote { offset, source })
    }

    /// Issues the next ranged read according to the current state. Returns
    /// `None` if the read produced no data and only changed the state.
    async fn read(&mut self, source: &dyn FileSource) -> Result<Option<Bytes>> {
        let offset = self.offset;
        let limit = self.chunk_size;

        match self.state.clone() {
            FetchState::Fetching => {
                metrics::increment_counter!("vitg_media_chunk_reads_total", "endpoint" => "origin");

                let response = source
                    .get_file(self.location, offset, limit)
                    .await
                    .map_err(|source| self.remote_error(source))?;

                match response {
                    FileResponse::Chunk(bytes) => Ok(Some(bytes)),
                    FileResponse::CdnRedirect(token) => {
                        debug!(offset, "Remote redirected the download to CDN");
                        self.via_cdn = true;
                        self.state = FetchState::CdnRedirected(token);
                        Ok(None)
                    }
                    FileResponse::Unrecognized(shape) => {
                        Err(err!(FetchError::UnexpectedResponse { offset, shape }))
                    }
                }
            }
            FetchState::CdnRedirected(token) => {
                metrics::increment_counter!("vitg_media_chunk_reads_total", "endpoint" => "cdn");

                let response = source
                    .get_cdn_file(&token, offset, limit)
                    .await
                    .map_err(|source| self.remote_error(source))?;

                match response {
                    CdnFileResponse::Chunk(bytes) => Ok(Some(bytes)),
                    CdnFileResponse::Unrecognized(shape) => {
                        Err(err!(FetchError::UnexpectedResponse { offset, shape }))
                    }
                }
            }
            FetchState::Done | FetchState::Failed => Err(fatal!(
                "BUG: attempted a ranged read in a terminal state {:?}",
                self.state
            )),
        }
    }

    /// Appends the chunk to the output. An empty chunk, or a chunk shorter
    /// than the chunk size, finishes the session.
    async fn accept(
        &mut self,
        chunk: Bytes,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result {
        self.reads += 1;

        let len = chunk.len();

        if len > self.chunk_size {
            return Err(err!(FetchError::UnexpectedResponse {
                offset: self.offset,
                shape: format!("chunk of {len} bytes exceeds the limit of {}", self.chunk_size),
            }));
        }

        if len == 0 {
            self.state = FetchState::Done;
            return Ok(());
        }

        out.write_all(&chunk)
            .await
            .map_err(err_ctx!(FetchError::Write))?;

        self.offset += len as i64;
        self.total_bytes += len as u64;

        if len < self.chunk_size {
            self.state = FetchState::Done;
        }

        Ok(())
    }
}

/// Sequential ranged-read loop against a remote file location that follows
/// CDN redirects transparently.
pub struct ChunkedFetcher<'s> {
    source: &'s dyn FileSource,
    chunk_size: usize,
}

impl<'s> ChunkedFetcher<'s> {
    pub fn new(source: &'s dyn FileSource, chunk_size: usize) -> Self {
        Self { source, chunk_size }
    }

    /// Writes the whole file at `location` into `out`.
    ///
    /// On success `out` holds the concatenation of all accepted chunks in
    /// offset order. On failure the content of `out` is unspecified and must
    /// be discarded by the caller.
    #[instrument(skip_all, fields(location = ?location, chunk_size = self.chunk_size))]
    pub async fn fetch(
        &self,
        location: &FileLocation,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<FetchSummary> {
        let mut session = DownloadSession::new(location, self.chunk_size);

        let result = self.run(&mut session, out).await;

        if let Err(err) = result {
            session.state = FetchState::Failed;
            debug!(
                offset = session.offset,
                reads = session.reads,
                err = tracing_err(&err),
                "Fetch loop failed"
            );
            return Err(err);
        }

        out.flush().await.map_err(err_ctx!(FetchError::Write))?;

        Ok(FetchSummary {
            total_bytes: session.total_bytes,
            reads: session.reads,
            via_cdn: session.via_cdn,
        })
    }

    async fn run(
        &self,
        session: &mut DownloadSession<'_>,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result {
        while !matches!(session.state, FetchState::Done | FetchState::Failed) {
            if let Some(chunk) = session.read(self.source).await? {
                session.accept(chunk, out).await?;
            }
        }
        Ok(())
    }
}
