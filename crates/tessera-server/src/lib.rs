//! # Tessera Server
//!
//! HTTP server, configuration and file handlers for Tessera.
//!
//! - [`ServerBuilder`] registers routes and middleware; [`Server`] serves
//!   them over HTTP/1.1 with Hyper
//! - [`ServerConfig`] and [`ConfigLoader`] layer defaults, a TOML or JSON
//!   file and `TESSERA_*` environment variables
//! - [`shutdown`] drains open connections on SIGTERM or SIGINT
//! - [`files`] holds the upload, download and static resource handlers
//!
//! ## Example
//!
//! ```rust,no_run
//! use tessera_core::handler_fn;
//! use tessera_server::{ConfigLoader, ServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tessera_server::ServerError> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("tessera.toml")?
//!         .load()?;
//!
//!     let mut builder = ServerBuilder::new(config);
//!     builder.get("/", handler_fn(|ctx| Box::pin(async move { ctx.set_resp_data("home") })))?;
//!     builder.build().run().await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
pub mod files;
mod loader;
mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ConfigError, ServerError};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use server::{HttpResponse, Server, ServerBuilder};
pub use shutdown::ShutdownSignal;
