//! Per-interaction session state
//!
//! A [`SessionStore`] owns the mutable context of interactions of one kind
//! (a result listing, a wizard). Each session has its own lock, so unrelated
//! sessions never contend; the store-wide map lock is only held long enough
//! to look a session up. Callers read and write through closures, which
//! keeps a read-then-use sequence (read the page, index into it) inside a
//! single critical section.
//!
//! A missing session is a normal condition: it means the interaction
//! concluded, expired or was superseded.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::value_objects::{ChannelId, MessageId, UserId};

/// Identifier shared by a session and the waiters of its interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub Uuid);

impl SessionKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who and where an interaction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub owner: UserId,
    pub channel_id: ChannelId,
    /// Message being paginated or confirmed, once it has been sent
    pub anchor: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

impl SessionMeta {
    pub fn new(owner: UserId, channel_id: ChannelId) -> Self {
        Self {
            owner,
            channel_id,
            anchor: None,
            created_at: Utc::now(),
        }
    }
}

struct Session<S> {
    meta: SessionMeta,
    state: S,
}

/// Typed session table for one interaction kind
pub struct SessionStore<S> {
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<Session<S>>>>>,
}

impl<S> Default for SessionStore<S> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> SessionStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session under a key minted by the caller
    pub fn insert(&self, key: SessionKey, meta: SessionMeta, state: S) {
        let previous = self
            .sessions
            .write()
            .insert(key, Arc::new(Mutex::new(Session { meta, state })));
        debug_assert!(previous.is_none(), "session key {key} collided");
    }

    /// Start a session under a fresh key
    pub fn create(&self, meta: SessionMeta, state: S) -> SessionKey {
        let key = SessionKey::new();
        self.insert(key, meta, state);
        key
    }

    fn entry(&self, key: SessionKey) -> Option<Arc<Mutex<Session<S>>>> {
        self.sessions.read().get(&key).cloned()
    }

    /// Read state inside the session's critical section
    pub fn read<R>(&self, key: SessionKey, f: impl FnOnce(&S) -> R) -> Option<R> {
        let entry = self.entry(key)?;
        let session = entry.lock();
        Some(f(&session.state))
    }

    /// Mutate state inside the session's critical section
    pub fn update<R>(&self, key: SessionKey, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let entry = self.entry(key)?;
        let mut session = entry.lock();
        Some(f(&mut session.state))
    }

    pub fn meta(&self, key: SessionKey) -> Option<SessionMeta> {
        let entry = self.entry(key)?;
        let session = entry.lock();
        Some(session.meta)
    }

    /// Record the anchor message once it has been sent
    pub fn set_anchor(&self, key: SessionKey, anchor: MessageId) -> bool {
        match self.entry(key) {
            Some(entry) => {
                entry.lock().meta.anchor = Some(anchor);
                true
            }
            None => false,
        }
    }

    /// End a session. Returns `false` if it was already gone.
    pub fn delete(&self, key: SessionKey) -> bool {
        self.sessions.write().remove(&key).is_some()
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        self.sessions.read().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl<S: Clone> SessionStore<S> {
    /// Copy of the current state
    pub fn snapshot(&self, key: SessionKey) -> Option<S> {
        self.read(key, S::clone)
    }

    /// End a session and return its final state
    pub fn take(&self, key: SessionKey) -> Option<S> {
        let entry = self.sessions.write().remove(&key)?;
        let session = entry.lock();
        Some(session.state.clone())
    }
}
