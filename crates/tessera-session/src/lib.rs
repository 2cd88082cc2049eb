//! # Tessera Session
//!
//! Server-side sessions for Tessera handlers and middleware.
//!
//! - [`Store`] creates, loads, refreshes and removes sessions by id
//! - [`Session`] holds per-user JSON values
//! - [`Propagator`] moves the id between request and response
//! - [`Manager`] combines a store and a propagator and caches the current
//!   session in the request [`Context`](tessera_core::Context)
//!
//! [`memory::MemoryStore`], [`RedisStore`](crate::redis::RedisStore) and
//! [`cookie::CookiePropagator`] are the bundled implementations.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tessera_session::{cookie::CookiePropagator, memory::MemoryStore, Manager};
//!
//! let manager = Manager::new(
//!     Arc::new(MemoryStore::new(Duration::from_secs(1800))),
//!     Arc::new(CookiePropagator::new().path("/").http_only(true)),
//! );
//! # let _ = manager;
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-session/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cookie;
mod error;
mod manager;
pub mod memory;
pub mod redis;
mod store;

pub use error::SessionError;
pub use manager::{Manager, DEFAULT_CTX_KEY};
pub use store::{Propagator, Session, Store};
