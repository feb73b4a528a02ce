//! Authentication state and its durable copy.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cinelist_api::backend::{ApiError, ProfilePatch, TokenStore, User};
use cinelist_db::{KeyValueStore, read_json, write_json};
use serde::{Deserialize, Serialize};

use crate::list::ListState;

/// Storage key of the persisted session.
const SESSION_KEY: &str = "session";

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Bearer token.
    pub token: Option<String>,
    /// Logged-in user.
    pub user: Option<User>,
    /// Whether both token and user are present.
    pub is_authenticated: bool,
}

impl Session {
    fn authenticated(token: String, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_authenticated: true,
        }
    }
}

/// Durable form of the session.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: Option<String>,
    user: Option<User>,
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    /// Bumped on every login and logout.
    epoch: u64,
}

/// Owner of the session.
///
/// Logging out also clears the lists registered here, so no list content
/// outlives the session that produced it.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
    lists: Vec<Arc<ListState>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &inner.session.is_authenticated)
            .field("epoch", &inner.epoch)
            .field("lists", &self.lists.len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a logged-out store. Call [`restore`](Self::restore) to load
    /// the persisted session.
    pub fn new(storage: Arc<dyn KeyValueStore>, lists: Vec<Arc<ListState>>) -> Self {
        Self {
            storage,
            inner: Mutex::new(Inner::default()),
            lists,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, session: &Session) {
        let stored = StoredSession {
            token: session.token.clone(),
            user: session.user.clone(),
        };
        if let Err(e) = write_json(self.storage.as_ref(), SESSION_KEY, &stored) {
            tracing::warn!("failed to persist session: {e:#}");
        }
    }

    /// Returns a copy of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// Whether a user is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_authenticated
    }

    /// Login/logout counter used to discard results that outlived their session.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Loads the persisted session without contacting the backend.
    ///
    /// Both token and user must be present; anything else, including
    /// unreadable data, yields a logged-out session.
    pub fn restore(&self) -> Session {
        let stored = match read_json::<StoredSession>(self.storage.as_ref(), SESSION_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("ignoring unreadable stored session: {e:#}");
                None
            }
        };
        let session = match stored {
            Some(StoredSession {
                token: Some(token),
                user: Some(user),
            }) if !token.trim().is_empty() => Session::authenticated(token, user),
            _ => Session::default(),
        };

        let mut inner = self.lock();
        inner.session = session.clone();
        inner.epoch = inner.epoch.wrapping_add(1);
        session
    }

    /// Stores a freshly logged-in session.
    ///
    /// When the user differs from the previously persisted one, the lists
    /// are cleared first.
    pub fn establish(&self, token: String, user: User) -> Session {
        let previous = self.previous_user_id();
        if previous.as_deref().is_some_and(|id| id != user.id) {
            tracing::info!("different user logged in, clearing local lists");
            for list in &self.lists {
                list.clear();
            }
        }

        let session = Session::authenticated(token, user);
        let mut inner = self.lock();
        inner.session = session.clone();
        inner.epoch = inner.epoch.wrapping_add(1);
        self.persist(&session);
        session
    }

    fn previous_user_id(&self) -> Option<String> {
        if let Some(user) = self.lock().session.user.as_ref() {
            return Some(user.id.clone());
        }
        match read_json::<StoredSession>(self.storage.as_ref(), SESSION_KEY) {
            Ok(stored) => stored.and_then(|s| s.user).map(|u| u.id),
            Err(_) => None,
        }
    }

    /// Ends the session in memory and storage and clears every list.
    pub fn logout(&self) {
        {
            let mut inner = self.lock();
            inner.session = Session::default();
            inner.epoch = inner.epoch.wrapping_add(1);
            if let Err(e) = self.storage.remove(SESSION_KEY) {
                tracing::warn!("failed to remove stored session: {e:#}");
            }
        }
        for list in &self.lists {
            list.clear();
        }
    }

    /// Merges `patch` into the logged-in user.
    ///
    /// Returns the updated session and the epoch it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when logged out.
    pub fn merge_user(&self, patch: &ProfilePatch) -> Result<(Session, u64), ApiError> {
        let mut inner = self.lock();
        let session = self
            .merge_locked(&mut inner, patch)
            .ok_or(ApiError::NotAuthenticated)?;
        Ok((session, inner.epoch))
    }

    /// Like [`merge_user`](Self::merge_user), but only if the session of
    /// `epoch` is still active.
    pub fn merge_user_if_current(&self, epoch: u64, patch: &ProfilePatch) -> Option<Session> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return None;
        }
        self.merge_locked(&mut inner, patch)
    }

    fn merge_locked(&self, inner: &mut Inner, patch: &ProfilePatch) -> Option<Session> {
        if !inner.session.is_authenticated {
            return None;
        }
        let user = inner.session.user.as_mut()?;
        user.apply(patch);
        let session = inner.session.clone();
        self.persist(&session);
        Some(session)
    }

    /// Replaces the user with the backend's copy if the session of `epoch`
    /// is still active.
    pub fn replace_user_if_current(&self, epoch: u64, user: User) -> Option<Session> {
        let mut inner = self.lock();
        if inner.epoch != epoch || !inner.session.is_authenticated {
            return None;
        }
        inner.session.user = Some(user);
        let session = inner.session.clone();
        self.persist(&session);
        Some(session)
    }

    /// Replaces the token if the session of `epoch` is still active.
    pub fn replace_token_if_current(&self, epoch: u64, token: &str) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch || !inner.session.is_authenticated {
            return false;
        }
        if inner.session.token.as_deref() == Some(token) {
            return true;
        }
        inner.session.token = Some(String::from(token));
        let session = inner.session.clone();
        self.persist(&session);
        true
    }
}

impl TokenStore for SessionStore {
    fn token(&self) -> Option<String> {
        let inner = self.lock();
        if inner.session.is_authenticated {
            inner.session.token.clone()
        } else {
            None
        }
    }

    fn store_token(&self, token: &str) {
        let epoch = self.epoch();
        self.replace_token_if_current(epoch, token);
    }

    fn expire(&self) {
        self.logout();
    }
}
