//! Ties a store and a propagator to the request context.

use std::sync::Arc;

use tessera_core::Context;
use tracing::debug;
use uuid::Uuid;

use crate::{Propagator, Session, SessionError, Store};

/// Default context key under which the current session is cached.
pub const DEFAULT_CTX_KEY: &str = "sessId";

/// Session lifecycle for one application.
///
/// The session resolved for a request is cached in the [`Context`] scratch
/// space under [`ctx_key`](Self::ctx_key), so repeated lookups inside one
/// request hit the store once.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tessera_session::{cookie::CookiePropagator, memory::MemoryStore, Manager};
///
/// let manager = Manager::new(
///     Arc::new(MemoryStore::new(Duration::from_secs(30 * 60))),
///     Arc::new(CookiePropagator::new()),
/// );
/// assert_eq!(manager.ctx_key(), "sessId");
/// ```
#[derive(Clone)]
pub struct Manager {
    store: Arc<dyn Store>,
    propagator: Arc<dyn Propagator>,
    ctx_key: String,
}

impl Manager {
    /// Creates a manager caching sessions under [`DEFAULT_CTX_KEY`].
    pub fn new(store: Arc<dyn Store>, propagator: Arc<dyn Propagator>) -> Self {
        Self {
            store,
            propagator,
            ctx_key: DEFAULT_CTX_KEY.to_owned(),
        }
    }

    /// Sets the context key used for caching.
    pub fn with_ctx_key(mut self, key: impl Into<String>) -> Self {
        self.ctx_key = key.into();
        self
    }

    /// The context key used for caching.
    #[must_use]
    pub fn ctx_key(&self) -> &str {
        &self.ctx_key
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Starts a new session: fresh UUID, store entry, id on the response.
    pub async fn init_session(&self, ctx: &mut Context) -> Result<Arc<dyn Session>, SessionError> {
        let id = Uuid::new_v4().to_string();
        let session = self.store.generate(&id).await?;
        self.propagator.inject(&id, ctx.writer_mut())?;
        ctx.set_user_value(self.ctx_key.clone(), Arc::clone(&session));
        debug!(session_id = %id, "Session created");
        Ok(session)
    }

    /// Returns the session for this request.
    ///
    /// Uses the context cache when populated, otherwise extracts the id from
    /// the request and loads it from the store.
    pub async fn get_session(&self, ctx: &mut Context) -> Result<Arc<dyn Session>, SessionError> {
        if let Some(session) = ctx.user_value::<Arc<dyn Session>>(&self.ctx_key) {
            return Ok(Arc::clone(session));
        }

        let id = self.propagator.extract(ctx.request())?;
        let session = self.store.get(&id).await?;
        ctx.set_user_value(self.ctx_key.clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Extends the lifetime of the current session.
    pub async fn refresh_session(&self, ctx: &mut Context) -> Result<(), SessionError> {
        let session = self.get_session(ctx).await?;
        self.store.refresh(session.id()).await
    }

    /// Ends the current session in the store, on the client and in the cache.
    pub async fn remove_session(&self, ctx: &mut Context) -> Result<(), SessionError> {
        let session = self.get_session(ctx).await?;
        self.store.remove(session.id()).await?;
        self.propagator.remove(ctx.writer_mut())?;
        ctx.remove_user_value(&self.ctx_key);
        debug!(session_id = %session.id(), "Session removed");
        Ok(())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("ctx_key", &self.ctx_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookiePropagator;
    use crate::memory::MemoryStore;
    use bytes::Bytes;
    use http::header::{COOKIE, SET_COOKIE};
    use http::Request;
    use serde_json::json;
    use std::time::Duration;

    fn manager() -> (Manager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        let manager = Manager::new(store.clone(), Arc::new(CookiePropagator::new()));
        (manager, store)
    }

    fn context(cookie: Option<&str>) -> Context {
        let mut builder = Request::builder().uri("/user");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        Context::new(builder.body(Bytes::new()).unwrap())
    }

    fn set_cookie(ctx: &Context) -> String {
        ctx.writer()
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn test_init_injects_and_caches() {
        let (manager, store) = manager();
        let mut ctx = context(None);

        let session = manager.init_session(&mut ctx).await.unwrap();
        assert_eq!(set_cookie(&ctx), format!("sessId={}", session.id()));
        assert_eq!(store.len(), 1);

        // Served from the cache even though the request has no cookie.
        let cached = manager.get_session(&mut ctx).await.unwrap();
        assert_eq!(cached.id(), session.id());
    }

    #[tokio::test]
    async fn test_get_from_cookie() {
        let (manager, _store) = manager();
        let mut login = context(None);
        let session = manager.init_session(&mut login).await.unwrap();
        session.set("nickname", json!("mkt")).await.unwrap();

        let mut ctx = context(Some(&format!("sessId={}", session.id())));
        let found = manager.get_session(&mut ctx).await.unwrap();
        assert_eq!(found.get("nickname").await.unwrap(), json!("mkt"));
        assert!(ctx.user_value::<Arc<dyn Session>>("sessId").is_some());
    }

    #[tokio::test]
    async fn test_get_without_cookie() {
        let (manager, _store) = manager();
        let mut ctx = context(None);
        let err = manager.get_session(&mut ctx).await.err().unwrap();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let (manager, _store) = manager();
        let mut ctx = context(Some("sessId=does-not-exist"));
        let err = manager.get_session(&mut ctx).await.err().unwrap();
        assert_eq!(err, SessionError::NotFound("does-not-exist".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_session() {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(10)));
        let manager = Manager::new(store.clone(), Arc::new(CookiePropagator::new()));
        let mut login = context(None);
        let id = manager.init_session(&mut login).await.unwrap().id().to_owned();

        tokio::time::advance(Duration::from_secs(8)).await;
        let mut ctx = context(Some(&format!("sessId={id}")));
        manager.refresh_session(&mut ctx).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_session() {
        let (manager, store) = manager();
        let mut login = context(None);
        let id = manager.init_session(&mut login).await.unwrap().id().to_owned();

        let mut ctx = context(Some(&format!("sessId={id}")));
        manager.remove_session(&mut ctx).await.unwrap();

        assert!(store.is_empty());
        assert_eq!(set_cookie(&ctx), "sessId=; Max-Age=-1");
        assert!(ctx.user_value::<Arc<dyn Session>>("sessId").is_none());
    }

    #[tokio::test]
    async fn test_custom_ctx_key() {
        let (manager, _store) = manager();
        let manager = manager.with_ctx_key("session");
        let mut ctx = context(None);
        manager.init_session(&mut ctx).await.unwrap();
        assert!(ctx.user_value::<Arc<dyn Session>>("session").is_some());
        assert!(ctx.user_value::<Arc<dyn Session>>("sessId").is_none());
    }
}
