//! Optimistic local/remote reconciliation of one list.

use std::sync::Arc;

use cinelist_api::backend::{ApiError, BackendApi, ListItem, ListKind};
use tracing::instrument;

use super::state::{ListState, Ticket};
use crate::session::SessionStore;
use crate::synced::{SyncWarning, Synced};

/// Applies list changes locally first, then replicates them to the backend.
///
/// Remote failures never undo a local change; they are recorded on the
/// list and returned as the warning of the result.
#[derive(Debug)]
pub struct ListReconciler<B> {
    state: Arc<ListState>,
    session: Arc<SessionStore>,
    backend: Arc<B>,
}

impl<B> Clone for ListReconciler<B> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            session: Arc::clone(&self.session),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: BackendApi + Sync> ListReconciler<B> {
    /// Creates a reconciler over `state`.
    pub const fn new(state: Arc<ListState>, session: Arc<SessionStore>, backend: Arc<B>) -> Self {
        Self {
            state,
            session,
            backend,
        }
    }

    /// Which list this reconciles.
    #[must_use]
    pub fn kind(&self) -> ListKind {
        self.state.kind()
    }

    /// The underlying list state.
    #[must_use]
    pub const fn state(&self) -> &Arc<ListState> {
        &self.state
    }

    fn failed(&self, ticket: Ticket, err: &ApiError) -> Synced<Vec<ListItem>> {
        let warning = SyncWarning::from(err);
        tracing::warn!(list = %self.kind(), "remote sync failed: {warning}");
        Synced::warned(self.state.fail(ticket, warning.clone()), warning)
    }

    /// Pulls the remote list.
    ///
    /// Logged out, the local list is returned without a network call. When
    /// the backend returns an empty list while the local one is not, the
    /// local items are uploaded and the list fetched again; if it is still
    /// empty the local list is kept.
    #[instrument(skip_all, fields(list = %self.kind()))]
    pub async fn fetch(&self) -> Synced<Vec<ListItem>> {
        if !self.session.is_authenticated() {
            return Synced::clean(self.state.items());
        }
        let kind = self.kind();
        let ticket = self.state.begin_fetch();

        let remote = match self.backend.list_items(kind).await {
            Ok(items) => items,
            Err(err) => return self.failed(ticket, &err),
        };
        if !remote.is_empty() {
            return Synced::clean(self.state.finish_fetch(ticket, remote));
        }

        let local = self.state.items();
        if local.is_empty() {
            return Synced::clean(self.state.finish_fetch(ticket, remote));
        }

        tracing::info!(count = local.len(), "remote list is empty, uploading local items");
        for item in &local {
            if !self.state.is_current(ticket) {
                break;
            }
            if let Err(err) = self.backend.add_item(kind, item).await {
                tracing::warn!(id = item.id, "failed to upload local item: {err}");
            }
        }

        match self.backend.list_items(kind).await {
            Ok(items) if !items.is_empty() => Synced::clean(self.state.finish_fetch(ticket, items)),
            Ok(_) => {
                tracing::info!("remote list still empty, keeping local items");
                Synced::clean(self.state.keep_local(ticket))
            }
            Err(err) => self.failed(ticket, &err),
        }
    }

    /// Adds `item` locally, then on the backend.
    #[instrument(skip_all, fields(list = %self.kind(), id = item.id))]
    pub async fn add(&self, item: ListItem) -> Synced<Vec<ListItem>> {
        let ticket = self.state.begin_add(item.clone());
        if !self.session.is_authenticated() {
            return Synced::clean(self.state.finish_mutation(ticket, None));
        }
        match self.backend.add_item(self.kind(), &item).await {
            Ok(remote) => Synced::clean(self.state.finish_mutation(ticket, Some(remote))),
            Err(err) => self.failed(ticket, &err),
        }
    }

    /// Removes `id` locally, then on the backend. A remote 404 counts as success.
    #[instrument(skip_all, fields(list = %self.kind(), id = id))]
    pub async fn remove(&self, id: u64) -> Synced<Vec<ListItem>> {
        let ticket = self.state.begin_remove(id);
        if !self.session.is_authenticated() {
            return Synced::clean(self.state.finish_mutation(ticket, None));
        }
        match self.backend.remove_item(self.kind(), id).await {
            Ok(remote) => Synced::clean(self.state.finish_mutation(ticket, Some(remote))),
            Err(err) if err.is_not_found() => {
                tracing::debug!("item already absent remotely");
                Synced::clean(self.state.finish_mutation(ticket, None))
            }
            Err(err) => self.failed(ticket, &err),
        }
    }

    /// Empties the list locally.
    pub fn clear(&self) {
        self.state.clear();
    }
}
