//! Application context owning the session and both lists.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use cinelist_api::backend::{ApiError, BackendApi, Credentials, ListKind};
use cinelist_db::KeyValueStore;
use tokio::task::JoinHandle;

use crate::auth::AuthService;
use crate::list::{ListReconciler, ListState};
use crate::session::{Session, SessionStore};

/// Session, auth service and list reconcilers wired to one backend.
///
/// Background reconciles started here are tracked and can be awaited with
/// [`settle`](Self::settle).
#[derive(Debug)]
pub struct SyncContext<B> {
    session: Arc<SessionStore>,
    auth: AuthService<B>,
    favorites: ListReconciler<B>,
    watchlist: ListReconciler<B>,
    backend: Arc<B>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: BackendApi + Send + Sync + 'static> SyncContext<B> {
    /// Builds the context over `storage`.
    ///
    /// `connect` receives the session store, which is the token source for
    /// the backend client it returns.
    ///
    /// # Errors
    ///
    /// Returns the error of `connect`.
    pub fn new<F>(storage: Arc<dyn KeyValueStore>, connect: F) -> Result<Self>
    where
        F: FnOnce(Arc<SessionStore>) -> Result<B>,
    {
        let favorites = Arc::new(ListState::new(ListKind::Favorites, Arc::clone(&storage)));
        let watchlist = Arc::new(ListState::new(ListKind::Watchlist, Arc::clone(&storage)));
        let session = Arc::new(SessionStore::new(
            storage,
            vec![Arc::clone(&favorites), Arc::clone(&watchlist)],
        ));
        let backend = Arc::new(connect(Arc::clone(&session))?);

        Ok(Self {
            auth: AuthService::new(Arc::clone(&session), Arc::clone(&backend)),
            favorites: ListReconciler::new(favorites, Arc::clone(&session), Arc::clone(&backend)),
            watchlist: ListReconciler::new(watchlist, Arc::clone(&session), Arc::clone(&backend)),
            backend,
            session,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// The session store.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Account operations.
    #[must_use]
    pub const fn auth(&self) -> &AuthService<B> {
        &self.auth
    }

    /// The backend client.
    #[must_use]
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The reconciler for `kind`.
    #[must_use]
    pub const fn list(&self, kind: ListKind) -> &ListReconciler<B> {
        match kind {
            ListKind::Favorites => &self.favorites,
            ListKind::Watchlist => &self.watchlist,
        }
    }

    /// Logs in, then reconciles both lists in the background.
    ///
    /// # Errors
    ///
    /// Returns the login error.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let session = self.auth.login(credentials).await?;
        self.reconcile_in_background();
        Ok(session)
    }

    /// Starts a fetch of both lists without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reconcile_in_background(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for reconciler in [&self.favorites, &self.watchlist] {
            let reconciler = reconciler.clone();
            tasks.push(tokio::spawn(async move {
                let synced = reconciler.fetch().await;
                if let Some(warning) = synced.warning {
                    tracing::warn!(list = %reconciler.kind(), "background sync failed: {warning}");
                } else {
                    tracing::debug!(
                        list = %reconciler.kind(),
                        count = synced.value.len(),
                        "background sync finished"
                    );
                }
            }));
        }
    }

    /// Waits for every background reconcile started so far.
    pub async fn settle(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!("background sync task failed: {e}");
            }
        }
    }
}
