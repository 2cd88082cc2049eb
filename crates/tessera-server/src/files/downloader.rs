//! File download as an attachment.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use http::header::{self, HeaderName, HeaderValue};
use http::StatusCode;
use tessera_core::{handler_fn, Context, HandleFunc};
use tracing::{debug, error, warn};

use super::join_within;

const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");
const CONTENT_DESCRIPTION: HeaderName = HeaderName::from_static("content-description");

/// Sends the file named by the `file` query parameter from `dir`.
///
/// The file is written straight to the response sink together with the
/// download headers. A missing or escaping name yields `400`, a missing file
/// `404`.
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    /// Creates a downloader serving files below `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory files are served from.
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Turns the downloader into a route handler.
    #[must_use]
    pub fn handler(self) -> HandleFunc {
        let downloader = Arc::new(self);
        handler_fn(move |ctx| {
            let downloader = Arc::clone(&downloader);
            Box::pin(async move { downloader.serve(ctx).await })
        })
    }

    async fn serve(&self, ctx: &mut Context) {
        let Ok(requested) = ctx.query_value("file") else {
            reject(ctx, StatusCode::BAD_REQUEST);
            return;
        };
        let Some(path) = join_within(&self.dir, &requested) else {
            warn!(file = %requested, "rejected download path");
            reject(ctx, StatusCode::BAD_REQUEST);
            return;
        };

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "download target not found");
                reject(ctx, StatusCode::NOT_FOUND);
                return;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read download target");
                reject(ctx, StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Ok(disposition) = HeaderValue::from_str(&format!("attachment;filename={file_name}")) else {
            reject(ctx, StatusCode::BAD_REQUEST);
            return;
        };

        let writer = ctx.writer_mut();
        let headers = writer.headers_mut();
        headers.insert(header::CONTENT_DISPOSITION, disposition);
        headers.insert(CONTENT_DESCRIPTION, HeaderValue::from_static("File Transfer"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        headers.insert(CONTENT_TRANSFER_ENCODING, HeaderValue::from_static("binary"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("must-revalidate"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("public"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));

        writer.write_header(StatusCode::OK);
        if let Err(e) = writer.write(&data) {
            error!(path = %path.display(), error = %e, "failed to write download");
        }
    }
}

fn reject(ctx: &mut Context, status: StatusCode) {
    ctx.writer_mut().write_header(status);
}
