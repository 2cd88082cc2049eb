//! The response sink.
//!
//! [`ResponseWriter`] plays the part of the raw connection: once a status is
//! written it is committed, and body bytes are appended in order. Handlers
//! normally leave it alone and fill the buffered fields on the
//! [`Context`](crate::Context) instead; those are copied here by the flush
//! step.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;

use crate::error::WriteError;

/// Raw response sink for one request.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    closed: bool,
}

impl ResponseWriter {
    /// Creates an open writer with nothing committed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer whose connection has already gone away.
    ///
    /// Every write fails with [`WriteError::Closed`].
    #[must_use]
    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Self::default()
        }
    }

    /// Marks the connection as gone.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Returns true if the connection is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Response headers. Changes after the status is committed still reach
    /// the client because the whole response is sent at the end.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Commits the status code. Later calls are ignored.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(committed) if committed != status => {
                tracing::debug!(
                    committed = %committed,
                    ignored = %status,
                    "status already written"
                );
            }
            Some(_) => {}
        }
    }

    /// Appends body bytes, committing `200 OK` if no status was written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.closed {
            return Err(WriteError::Closed);
        }
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    /// The committed status, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Bytes written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the sink into an HTTP response.
    ///
    /// A writer that never committed a status answers `200 OK`.
    #[must_use]
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
