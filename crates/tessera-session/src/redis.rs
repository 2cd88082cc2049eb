//! Redis-backed session store.
//!
//! Each session is one hash at `{prefix}:{id}`. The hash always carries a
//! marker field (the id itself) so an empty session still exists, and the
//! key's TTL is the session lifetime: [`Store::generate`] and
//! [`Store::refresh`] both reset it, and Redis drops the key when it lapses.
//! Values are stored as JSON text in the remaining fields.

use std::sync::Arc;
use std::time::Duration;

use ::redis::aio::{ConnectionLike, ConnectionManager};
use ::redis::{AsyncCommands, RedisError, Script};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{Session, SessionError, Store};

/// Key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "tessera:session";

/// Session lifetime used when none is configured.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(15 * 60);

// HSET only while the session hash exists, so a write never resurrects an
// expired session without a TTL.
const SET_IF_EXISTS: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 1 then
    return redis.call("HSET", KEYS[1], ARGV[1], ARGV[2])
end
return -1
"#;

/// A [`Store`] keeping sessions in Redis hashes.
///
/// Generic over the connection so callers can pass any
/// [`ConnectionLike`]; [`RedisStore::connect`] builds a reconnecting
/// [`ConnectionManager`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tessera_session::redis::RedisStore;
///
/// # async fn run() -> Result<(), tessera_session::SessionError> {
/// let store = RedisStore::connect("redis://127.0.0.1:6379")
///     .await?
///     .prefix("shop:sess")
///     .expiration(Duration::from_secs(3600));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore<C = ConnectionManager> {
    conn: C,
    prefix: String,
    expiration: Duration,
    set_script: Arc<Script>,
}

impl RedisStore<ConnectionManager> {
    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = ::redis::Client::open(url).map_err(store_error)?;
        let conn = ConnectionManager::new(client).await.map_err(store_error)?;
        Ok(Self::new(conn))
    }
}

impl<C> RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    /// Wraps an open connection, using [`DEFAULT_PREFIX`] and
    /// [`DEFAULT_EXPIRATION`].
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            prefix: DEFAULT_PREFIX.to_string(),
            expiration: DEFAULT_EXPIRATION,
            set_script: Arc::new(Script::new(SET_IF_EXISTS)),
        }
    }

    /// Sets the key prefix. An empty prefix stores sessions under their id.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// The Redis key holding session `id`.
    #[must_use]
    pub fn key(&self, id: &str) -> String {
        session_key(&self.prefix, id)
    }

    fn session(&self, id: &str, key: String) -> Arc<dyn Session> {
        Arc::new(RedisSession {
            id: id.to_owned(),
            key,
            conn: self.conn.clone(),
            set_script: Arc::clone(&self.set_script),
        })
    }
}

impl<C> std::fmt::Debug for RedisStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> Store for RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let created: Result<(), RedisError> = ::redis::pipe()
            .atomic()
            .hset(&key, id, id)
            .ignore()
            .pexpire(&key, expiration_millis(self.expiration))
            .ignore()
            .query_async(&mut conn)
            .await;
        created.map_err(store_error)?;
        debug!(session_id = %id, key = %key, "Created session");
        Ok(self.session(id, key))
    }

    async fn refresh(&self, id: &str) -> Result<(), SessionError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let extended: bool = conn
            .pexpire(&key, expiration_millis(self.expiration))
            .await
            .map_err(store_error)?;
        if extended {
            Ok(())
        } else {
            Err(SessionError::NotFound(id.to_owned()))
        }
    }

    async fn remove(&self, id: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(id)).await.map_err(store_error)?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(&key).await.map_err(store_error)?;
        if !exists {
            return Err(SessionError::NotFound(id.to_owned()));
        }
        Ok(self.session(id, key))
    }
}

/// A session held by [`RedisStore`].
///
/// Every call goes to Redis; nothing is cached locally.
pub struct RedisSession<C = ConnectionManager> {
    id: String,
    key: String,
    conn: C,
    set_script: Arc<Script>,
}

impl<C> std::fmt::Debug for RedisSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSession")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> Session for RedisSession<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Value, SessionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(&self.key, key).await.map_err(store_error)?;
        raw.map(decode_value)
            .ok_or_else(|| SessionError::KeyNotFound(key.to_owned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SessionError> {
        let encoded =
            serde_json::to_string(&value).map_err(|e| SessionError::Store(e.to_string()))?;
        let mut conn = self.conn.clone();
        let written: i64 = self
            .set_script
            .key(&self.key)
            .arg(key)
            .arg(encoded)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;
        if written < 0 {
            return Err(SessionError::NotFound(self.id.clone()));
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn session_key(prefix: &str, id: &str) -> String {
    if prefix.is_empty() {
        id.to_owned()
    } else {
        format!("{prefix}:{id}")
    }
}

fn expiration_millis(expiration: Duration) -> i64 {
    i64::try_from(expiration.as_millis()).unwrap_or(i64::MAX).max(1)
}

/// Fields written by other clients may not be JSON; they read as strings.
fn decode_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn store_error(err: RedisError) -> SessionError {
    SessionError::Store(err.to_string())
}
