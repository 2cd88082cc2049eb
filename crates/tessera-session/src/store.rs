//! The three seams of session handling.
//!
//! A [`Store`] owns session lifetimes, a [`Session`] owns per-user values,
//! and a [`Propagator`] moves the session id between the wire and the server.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use serde_json::Value;
use tessera_core::ResponseWriter;

use crate::SessionError;

/// Per-user key/value data addressed by an opaque id.
#[async_trait]
pub trait Session: Send + Sync {
    /// Returns the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Value, SessionError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), SessionError>;

    /// The session id.
    fn id(&self) -> &str;
}

/// Creates, looks up, extends and deletes sessions.
///
/// The caller chooses the id; stores never generate one.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates an empty session under `id`.
    async fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError>;

    /// Pushes the expiry of `id` forward by the store's lifetime.
    async fn refresh(&self, id: &str) -> Result<(), SessionError>;

    /// Deletes `id`. Removing an unknown id is not an error.
    async fn remove(&self, id: &str) -> Result<(), SessionError>;

    /// Returns the live session for `id`.
    async fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError>;
}

/// Carries the session id on requests and responses.
pub trait Propagator: Send + Sync {
    /// Attaches `id` to the outgoing response.
    fn inject(&self, id: &str, writer: &mut ResponseWriter) -> Result<(), SessionError>;

    /// Reads the session id from an incoming request.
    fn extract(&self, request: &Request<Bytes>) -> Result<String, SessionError>;

    /// Tells the client to forget its session id.
    fn remove(&self, writer: &mut ResponseWriter) -> Result<(), SessionError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        (**self).generate(id).await
    }

    async fn refresh(&self, id: &str) -> Result<(), SessionError> {
        (**self).refresh(id).await
    }

    async fn remove(&self, id: &str) -> Result<(), SessionError> {
        (**self).remove(id).await
    }

    async fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        (**self).get(id).await
    }
}

impl<P: Propagator + ?Sized> Propagator for Arc<P> {
    fn inject(&self, id: &str, writer: &mut ResponseWriter) -> Result<(), SessionError> {
        (**self).inject(id, writer)
    }

    fn extract(&self, request: &Request<Bytes>) -> Result<String, SessionError> {
        (**self).extract(request)
    }

    fn remove(&self, writer: &mut ResponseWriter) -> Result<(), SessionError> {
        (**self).remove(writer)
    }
}
