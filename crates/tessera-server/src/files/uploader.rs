//! Multipart file upload.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, StatusCode};
use tessera_core::{handler_fn, Context, HandleFunc};
use thiserror::Error;
use tracing::{error, info};

/// Body sent after a successful upload.
pub const UPLOAD_SUCCEEDED: &str = "upload succeeded";

/// What the destination function learns about an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Form field the file arrived in.
    pub field_name: String,
    /// File name supplied by the client, if any.
    pub file_name: Option<String>,
    /// Declared content type, if any.
    pub content_type: Option<mime::Mime>,
    /// Size of the file in bytes.
    pub size: usize,
}

type DstPathFn = Arc<dyn Fn(&FileHeader) -> PathBuf + Send + Sync>;

/// Stores the file sent in one form field of a `multipart/form-data` request.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use tessera_server::files::FileUploader;
///
/// let upload = FileUploader::new("myfile", |header| {
///     PathBuf::from("/tmp/uploads").join(header.file_name.as_deref().unwrap_or("upload.bin"))
/// })
/// .handler();
/// ```
#[derive(Clone)]
pub struct FileUploader {
    file_field: String,
    dst_path_fn: DstPathFn,
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("missing or invalid multipart content type")]
    ContentType,
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("no field named {0}")]
    MissingField(String),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

impl FileUploader {
    /// Creates an uploader reading `file_field` and storing the file at the
    /// path `dst_path_fn` computes.
    pub fn new<F>(file_field: impl Into<String>, dst_path_fn: F) -> Self
    where
        F: Fn(&FileHeader) -> PathBuf + Send + Sync + 'static,
    {
        Self {
            file_field: file_field.into(),
            dst_path_fn: Arc::new(dst_path_fn),
        }
    }

    /// Name of the form field holding the file.
    #[must_use]
    pub fn file_field(&self) -> &str {
        &self.file_field
    }

    /// Turns the uploader into a route handler.
    ///
    /// Success buffers `200` with [`UPLOAD_SUCCEEDED`]. Any failure is logged
    /// and buffers `500` with a short reason.
    #[must_use]
    pub fn handler(self) -> HandleFunc {
        let uploader = Arc::new(self);
        handler_fn(move |ctx| {
            let uploader = Arc::clone(&uploader);
            Box::pin(async move {
                match uploader.store(ctx).await {
                    Ok(path) => {
                        info!(path = %path.display(), "file uploaded");
                        ctx.set_resp_data(UPLOAD_SUCCEEDED);
                    }
                    Err(err) => {
                        error!(error = %err, field = %uploader.file_field, "upload failed");
                        let body = if matches!(err, UploadError::Write { .. }) {
                            "upload failed"
                        } else {
                            "upload failed: no file data"
                        };
                        ctx.set_resp_status(StatusCode::INTERNAL_SERVER_ERROR);
                        ctx.set_resp_data(body);
                    }
                }
            })
        })
    }

    async fn store(&self, ctx: &Context) -> Result<PathBuf, UploadError> {
        let boundary = ctx
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| multer::parse_boundary(ct).ok())
            .ok_or(UploadError::ContentType)?;

        let body = ctx.body().clone();
        let stream = futures_util::stream::once(async move { Ok::<Bytes, io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(self.file_field.as_str()) {
                continue;
            }
            let field_name = self.file_field.clone();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().cloned();
            let data = field.bytes().await?;

            let header = FileHeader {
                field_name,
                file_name,
                content_type,
                size: data.len(),
            };
            let path = (self.dst_path_fn)(&header);
            tokio::fs::write(&path, &data)
                .await
                .map_err(|source| UploadError::Write { path: path.clone(), source })?;
            return Ok(path);
        }

        Err(UploadError::MissingField(self.file_field.clone()))
    }
}

impl std::fmt::Debug for FileUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUploader")
            .field("file_field", &self.file_field)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request};

    const BOUNDARY: &str = "X-TESSERA-BOUNDARY";

    fn multipart_request(field: &str, file_name: &str, content: &str) -> Request<Bytes> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Bytes::from(body))
            .unwrap()
    }

    fn uploader(dir: &std::path::Path) -> HandleFunc {
        let dir = dir.to_path_buf();
        FileUploader::new("myfile", move |h| {
            dir.join(h.file_name.as_deref().unwrap_or("unnamed"))
        })
        .handler()
    }

    #[tokio::test]
    async fn test_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let handler = uploader(dir.path());

        let mut ctx = Context::new(multipart_request("myfile", "hello.txt", "file body"));
        handler(&mut ctx).await;

        assert_eq!(ctx.resp_status(), None);
        assert_eq!(ctx.resp_data(), UPLOAD_SUCCEEDED.as_bytes());
        let stored = std::fs::read_to_string(dir.path().join("hello.txt")).unwrap();
        assert_eq!(stored, "file body");
    }

    #[tokio::test]
    async fn test_upload_passes_header_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let handler = {
            let seen = Arc::clone(&seen);
            let dir = dir.path().to_path_buf();
            FileUploader::new("myfile", move |h| {
                *seen.lock() = Some(h.clone());
                dir.join("out.bin")
            })
            .handler()
        };

        let mut ctx = Context::new(multipart_request("myfile", "a.txt", "abc"));
        handler(&mut ctx).await;

        let header = seen.lock().clone().unwrap();
        assert_eq!(header.field_name, "myfile");
        assert_eq!(header.file_name.as_deref(), Some("a.txt"));
        assert_eq!(header.content_type, Some(mime::TEXT_PLAIN));
        assert_eq!(header.size, 3);
    }

    #[tokio::test]
    async fn test_upload_missing_field_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let handler = uploader(dir.path());

        let mut ctx = Context::new(multipart_request("other", "hello.txt", "x"));
        handler(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!dir.path().join("hello.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_without_multipart_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let handler = uploader(dir.path());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(Bytes::from_static(b"plain"))
            .unwrap();
        let mut ctx = Context::new(req);
        handler(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_upload_unwritable_destination_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no/such/dir");
        let handler = uploader(&missing);

        let mut ctx = Context::new(multipart_request("myfile", "hello.txt", "x"));
        handler(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(ctx.resp_data(), b"upload failed");
    }
}
