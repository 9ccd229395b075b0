//! The operator's session: who is signed in and what they may do.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::gateway::{Gateway, GatewayResult};
use crate::models::SessionUser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

/// The [`Session`] of one signed-in browser.
///
/// Roles and permissions are only ever replaced wholesale, from whatever the
/// backend returned at sign-in. Nothing here recomputes them, so they can go
/// stale if an administrator edits the operator's roles mid-session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the identity. Roles and permissions are left alone.
    pub fn set_user(&self, user: Option<SessionUser>) {
        self.write().user = user;
    }

    pub fn set_roles<I, S>(&self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().roles = roles.into_iter().map(Into::into).collect();
    }

    pub fn set_permissions<I, S>(&self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().permissions = permissions.into_iter().map(Into::into).collect();
    }

    /// False for every name when nobody is signed in.
    pub fn has_permission(&self, name: &str) -> bool {
        self.read().permissions.contains(name)
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().user.is_some()
    }

    pub fn roles(&self) -> Vec<String> {
        self.read().roles.iter().cloned().collect()
    }

    pub fn permissions(&self) -> Vec<String> {
        self.read().permissions.iter().cloned().collect()
    }

    /// Signs out at the backend, then clears the local session.
    ///
    /// The local session is cleared even when the backend call fails; the
    /// backend's outcome is returned so the caller can log it.
    pub async fn logout(&self, gateway: &dyn Gateway) -> GatewayResult<()> {
        let outcome = match self.current_user() {
            Some(user) => gateway.sign_out(user.id).await,
            None => Ok(()),
        };

        *self.write() = Session::default();
        outcome
    }
}

/// How long a browser session stays valid after sign-in.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    store: SessionStore,
    issued_at: Instant,
}

/// Signed-in browsers, keyed by the opaque token held in their session cookie.
#[derive(Clone)]
pub struct SessionRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Registers a freshly signed-in session and returns its new token.
    /// Expired entries are dropped on the way.
    pub fn insert(&self, store: SessionStore) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.issued_at.elapsed() < ttl);
        entries.insert(
            token.clone(),
            Entry {
                store,
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// The signed-in session behind `token`, if it is known, fresh and still
    /// has a user.
    pub fn get(&self, token: &str) -> Option<SessionStore> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(token)
            .filter(|entry| entry.issued_at.elapsed() < self.ttl)
            .map(|entry| entry.store.clone())
            .filter(SessionStore::is_authenticated)
    }

    pub fn remove(&self, token: &str) -> Option<SessionStore> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .map(|entry| entry.store)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
