//! Static resources served by file extension.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::StatusCode;
use lru::LruCache;
use parking_lot::Mutex;
use tessera_core::{handler_fn, Context, HandleFunc, ResponseWriter};
use tracing::{debug, error, warn};

use super::join_within;

#[derive(Debug, Clone)]
struct CachedFile {
    content_type: HeaderValue,
    data: Bytes,
}

/// Serves files from a directory, named by the `file` path parameter.
///
/// Only extensions with a registered content type are served. Files smaller
/// than the configured limit are kept in an LRU cache once read.
///
/// # Example
///
/// ```rust,no_run
/// use tessera_server::files::StaticResourceHandler;
///
/// let assets = StaticResourceHandler::new("./static")
///     .with_extension("css", "text/css")
///     .with_cache(128, 1024 * 1024)
///     .handler();
/// ```
pub struct StaticResourceHandler {
    dir: PathBuf,
    content_types: HashMap<String, String>,
    cache: Option<Mutex<LruCache<String, CachedFile>>>,
    max_file_size: usize,
}

impl StaticResourceHandler {
    /// Creates a handler for `dir` with the default extension table and no
    /// cache.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let content_types = [
            ("jpeg", "image/jpeg"),
            ("jpe", "image/jpeg"),
            ("jpg", "image/jpeg"),
            ("png", "image/png"),
            ("pdf", "image/pdf"),
        ]
        .into_iter()
        .map(|(ext, ct)| (ext.to_string(), ct.to_string()))
        .collect();

        Self {
            dir: dir.into(),
            content_types,
            cache: None,
            max_file_size: 0,
        }
    }

    /// Serves files ending in `.ext` with `content_type`.
    #[must_use]
    pub fn with_extension(mut self, ext: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.content_types.insert(ext.into(), content_type.into());
        self
    }

    /// Caches up to `max_entries` files smaller than `max_file_size` bytes.
    ///
    /// Zero entries disables the cache.
    #[must_use]
    pub fn with_cache(mut self, max_entries: usize, max_file_size: usize) -> Self {
        self.cache = NonZeroUsize::new(max_entries).map(|cap| Mutex::new(LruCache::new(cap)));
        self.max_file_size = max_file_size;
        self
    }

    /// The directory files are served from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of cached files.
    #[must_use]
    pub fn cached_files(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.lock().len())
    }

    /// Turns the handler into a route handler. Use it on a pattern with a
    /// `:file` parameter.
    #[must_use]
    pub fn handler(self) -> HandleFunc {
        Arc::new(self).shared_handler()
    }

    /// Like [`handler`](Self::handler) but keeps a handle on the cache.
    #[must_use]
    pub fn shared_handler(self: Arc<Self>) -> HandleFunc {
        handler_fn(move |ctx| {
            let this = Arc::clone(&self);
            Box::pin(async move { this.serve(ctx).await })
        })
    }

    async fn serve(&self, ctx: &mut Context) {
        let requested = ctx.path_value("file").unwrap_or_default();

        if let Some(item) = self.cached(&requested) {
            debug!(file = %requested, "serving static file from cache");
            write_item(ctx.writer_mut(), &item);
            return;
        }

        let Some(path) = join_within(&self.dir, &requested) else {
            warn!(file = %requested, "rejected static file path");
            ctx.writer_mut().write_header(StatusCode::BAD_REQUEST);
            return;
        };

        let data = match tokio::fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "failed to open static file");
                ctx.writer_mut().write_header(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        };

        let Some(content_type) = self.content_type_for(&requested) else {
            ctx.writer_mut().write_header(StatusCode::BAD_REQUEST);
            return;
        };

        let item = CachedFile { content_type, data };
        self.store(requested, &item);
        write_item(ctx.writer_mut(), &item);
    }

    fn content_type_for(&self, name: &str) -> Option<HeaderValue> {
        let ext = file_ext(name)?;
        let content_type = self.content_types.get(ext)?;
        match HeaderValue::from_str(content_type) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(ext, content_type = %content_type, error = %e, "invalid content type");
                None
            }
        }
    }

    fn cached(&self, name: &str) -> Option<CachedFile> {
        self.cache.as_ref()?.lock().get(name).cloned()
    }

    fn store(&self, name: String, item: &CachedFile) {
        if let Some(cache) = &self.cache {
            if item.data.len() < self.max_file_size {
                cache.lock().put(name, item.clone());
            }
        }
    }
}

impl std::fmt::Debug for StaticResourceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticResourceHandler")
            .field("dir", &self.dir)
            .field("extensions", &self.content_types.len())
            .field("cached_files", &self.cached_files())
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}

/// The text after the last `.`, or `None` when there is none or it is empty.
fn file_ext(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

fn write_item(writer: &mut ResponseWriter, item: &CachedFile) {
    writer.headers_mut().insert(header::CONTENT_TYPE, item.content_type.clone());
    writer
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(item.data.len()));
    writer.write_header(StatusCode::OK);
    if let Err(e) = writer.write(&item.data) {
        error!(error = %e, "failed to write static file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request};
    use tessera_middleware::{dispatcher, HandlerRouter};

    async fn fetch(handler: &HandleFunc, path: &str) -> ResponseWriter {
        let mut router = HandlerRouter::new();
        router
            .add_route(Method::GET, "/static/:file", Arc::clone(handler))
            .unwrap();
        let dispatch = dispatcher(Arc::new(router));

        let req = Request::builder().uri(path).body(Bytes::new()).unwrap();
        let mut ctx = Context::new(req);
        dispatch(&mut ctx).await;
        ctx.into_writer()
    }

    #[test]
    fn test_file_ext() {
        assert_eq!(file_ext("a.png"), Some("png"));
        assert_eq!(file_ext("archive.tar.gz"), Some("gz"));
        assert_eq!(file_ext("noext"), None);
        assert_eq!(file_ext("trailing."), None);
    }

    #[tokio::test]
    async fn test_serves_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), b"\x89PNG").unwrap();
        let handler = StaticResourceHandler::new(dir.path()).handler();

        let writer = fetch(&handler, "/static/logo.png").await;
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(writer.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(writer.body(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_unknown_extension_is_400_and_missing_file_is_500() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let handler = StaticResourceHandler::new(dir.path()).handler();

        let writer = fetch(&handler, "/static/notes.txt").await;
        assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));

        // The open happens before the extension check.
        let writer = fetch(&handler, "/static/missing.txt").await;
        assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_serves_encoded_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my logo.png"), b"\x89PNG").unwrap();
        let handler = StaticResourceHandler::new(dir.path()).handler();

        let writer = fetch(&handler, "/static/my%20logo.png").await;
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.body(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("site.css"), "body{}").unwrap();
        let handler = StaticResourceHandler::new(dir.path())
            .with_extension("css", "text/css")
            .handler();

        let writer = fetch(&handler, "/static/site.css").await;
        assert_eq!(writer.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn test_cache_serves_after_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"small").unwrap();
        std::fs::write(dir.path().join("big.jpg"), vec![0u8; 64]).unwrap();

        let assets = Arc::new(StaticResourceHandler::new(dir.path()).with_cache(4, 16));
        let handler = Arc::clone(&assets).shared_handler();

        assert_eq!(fetch(&handler, "/static/a.jpg").await.status(), Some(StatusCode::OK));
        assert_eq!(fetch(&handler, "/static/big.jpg").await.status(), Some(StatusCode::OK));
        // Only the file under the size limit is kept.
        assert_eq!(assets.cached_files(), 1);

        std::fs::remove_file(&path).unwrap();
        let writer = fetch(&handler, "/static/a.jpg").await;
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.body(), b"small");
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recently_used() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1.png", "2.png", "3.png"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        let assets = Arc::new(StaticResourceHandler::new(dir.path()).with_cache(2, 1024));
        let handler = Arc::clone(&assets).shared_handler();

        for name in ["1.png", "2.png", "3.png"] {
            fetch(&handler, &format!("/static/{name}")).await;
        }
        assert_eq!(assets.cached_files(), 2);
        assert!(assets.cached("1.png").is_none());
        assert!(assets.cached("3.png").is_some());
    }

    #[tokio::test]
    async fn test_zero_entries_disables_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), "x").unwrap();
        let assets = Arc::new(StaticResourceHandler::new(dir.path()).with_cache(0, 1024));
        let handler = Arc::clone(&assets).shared_handler();

        fetch(&handler, "/static/a.png").await;
        assert_eq!(assets.cached_files(), 0);
    }
}
