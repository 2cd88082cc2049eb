//! In-process session store.
//!
//! Sessions live in a [`DashMap`] with a per-entry deadline. Expired entries
//! are invisible to every operation and are dropped lazily on access, by
//! [`MemoryStore::purge_expired`], or by the background janitor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Session, SessionError, Store};

struct Entry {
    session: Arc<MemorySession>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A [`Store`] that keeps sessions in memory for a fixed lifetime.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tessera_session::{memory::MemoryStore, Store};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryStore::new(Duration::from_secs(30 * 60));
/// let session = store.generate("abc").await.unwrap();
/// session.set("nickname", "mkt".into()).await.unwrap();
///
/// let again = store.get("abc").await.unwrap();
/// assert_eq!(again.get("nickname").await.unwrap(), "mkt");
/// # });
/// ```
pub struct MemoryStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryStore {
    /// Creates a store whose sessions live for `ttl` after creation or refresh.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Session lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every expired session and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if self.sessions.remove_if(&id, |_, e| e.is_expired(now)).is_some() {
                removed += 1;
                debug!(session_id = %id, "Purged expired session");
            }
        }

        if removed > 0 {
            info!(count = removed, "Purged expired sessions");
        }
        removed
    }

    /// Spawns a task that calls [`purge_expired`](Self::purge_expired) every
    /// `period`.
    ///
    /// The task holds a weak reference and exits once the store is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_janitor(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Session store dropped, stopping janitor");
                    break;
                };
                store.purge_expired();
            }
        })
    }

    fn live(&self, id: &str) -> Option<Arc<MemorySession>> {
        let now = Instant::now();
        let expired = match self.sessions.get(id) {
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.session)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove_if(id, |_, e| e.is_expired(now));
        }
        None
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("sessions", &self.sessions.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let session = Arc::new(MemorySession::new(id));
        self.sessions.insert(
            id.to_owned(),
            Entry {
                session: Arc::clone(&session),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(session)
    }

    async fn refresh(&self, id: &str) -> Result<(), SessionError> {
        let now = Instant::now();
        match self.sessions.get_mut(id) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = now + self.ttl;
                Ok(())
            }
            _ => Err(SessionError::NotFound(id.to_owned())),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        match self.live(id) {
            Some(session) => Ok(session),
            None => Err(SessionError::NotFound(id.to_owned())),
        }
    }
}

/// A session held by [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            values: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&self, key: &str) -> Result<Value, SessionError> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::KeyNotFound(key.to_owned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.values.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}
