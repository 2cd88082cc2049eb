//! File handler demo: upload, download and static assets.
//!
//! ```text
//! cargo run -p tessera --example files
//! curl -F 'myfile=@photo.png' localhost:8080/upload
//! curl -OJ 'localhost:8080/download?file=photo.png'
//! curl -i localhost:8080/static/photo.png
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use tessera::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tessera::telemetry::init_logging(&tessera::telemetry::LogConfig::development())
        .context("failed to initialize logging")?;

    let dir = std::env::temp_dir().join("tessera-files");
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let upload_dir = dir.clone();
    let uploader = FileUploader::new("myfile", move |header| {
        let name = header
            .file_name
            .as_deref()
            .and_then(|n| PathBuf::from(n).file_name().map(std::ffi::OsStr::to_os_string))
            .unwrap_or_else(|| "upload.bin".into());
        upload_dir.join(name)
    });

    let mut builder = ServerBuilder::new(ServerConfig::default());
    builder
        .post("/upload", uploader.handler())?
        .get("/download", FileDownloader::new(&dir).handler())?
        .get(
            "/static/:file",
            StaticResourceHandler::new(&dir)
                .with_extension("txt", "text/plain")
                .with_cache(64, 512 * 1024)
                .handler(),
        )?;
    builder.use_middleware(Recovery::new()).use_middleware(AccessLog::new());

    tracing::info!(dir = %dir.display(), "serving files");
    builder.build().run().await?;
    Ok(())
}
