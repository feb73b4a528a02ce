//! In-memory list state mirrored to durable storage.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cinelist_api::backend::{ListItem, ListKind};
use cinelist_db::{KeyValueStore, read_json, write_json};

use crate::synced::SyncWarning;

/// Transient status of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// No operation has run yet.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch finished.
    Loaded,
    /// A mutation is in flight.
    Mutating,
    /// The last mutation finished.
    Applied,
    /// The last operation failed remotely.
    Failed,
}

impl fmt::Display for ListPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Mutating => "mutating",
            Self::Applied => "applied",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    /// Items in insertion order.
    pub items: Vec<ListItem>,
    /// Current phase.
    pub phase: ListPhase,
    /// Last recorded replication failure.
    pub error: Option<SyncWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalOp {
    Added,
    Removed,
}

/// Latest local operation on one movie ID.
#[derive(Debug, Clone, Copy)]
struct Touch {
    seq: u64,
    op: LocalOp,
    in_flight: bool,
}

/// Handle for an operation started against the list.
///
/// A ticket from before the last `clear()` is stale; finishing it leaves
/// the list untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    /// Local operation counter when the ticket was issued.
    seq: u64,
    /// List generation when the ticket was issued.
    generation: u64,
    /// Movie ID of a mutation ticket.
    id: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    items: Vec<ListItem>,
    phase: ListPhase,
    error: Option<SyncWarning>,
    seq: u64,
    generation: u64,
    touched: HashMap<u64, Touch>,
    /// Unfinished tickets of this generation, counted by `seq`.
    open: BTreeMap<u64, u32>,
}

impl Inner {
    fn is_current(&self, ticket: Ticket) -> bool {
        self.generation == ticket.generation
    }

    /// Whether a remote copy of `id` must be ignored for `ticket`.
    ///
    /// True when the ID was removed locally after the ticket was issued, or
    /// its removal has not been confirmed yet.
    fn suppressed(&self, id: u64, ticket: Ticket) -> bool {
        self.touched
            .get(&id)
            .is_some_and(|t| t.op == LocalOp::Removed && (t.seq > ticket.seq || t.in_flight))
    }

    /// Whether a local item must be kept even though the remote copy lacks it.
    fn pending_add(&self, id: u64, ticket: Ticket) -> bool {
        self.touched
            .get(&id)
            .is_some_and(|t| t.op == LocalOp::Added && (t.seq > ticket.seq || t.in_flight))
    }

    /// Issues a ticket at `seq` for the current generation.
    fn issue(&mut self, seq: u64, id: Option<u64>) -> Ticket {
        let count = self.open.entry(seq).or_insert(0);
        *count = count.saturating_add(1);
        Ticket {
            seq,
            generation: self.generation,
            id,
        }
    }

    /// Finishes `ticket` and forgets touches no open ticket can still see.
    ///
    /// A settled touch matters only to tickets issued before it.
    fn settle(&mut self, ticket: Ticket) {
        if let Some(id) = ticket.id
            && let Some(touch) = self.touched.get_mut(&id)
            && touch.seq == ticket.seq
        {
            touch.in_flight = false;
        }
        if let Some(count) = self.open.get_mut(&ticket.seq) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.open.remove(&ticket.seq);
            }
        }
        let oldest = self.open.keys().next().copied();
        self.touched
            .retain(|_, t| t.in_flight || oldest.is_some_and(|seq| seq < t.seq));
    }

    fn contains(&self, id: u64) -> bool {
        self.items.iter().any(|item| item.id == id)
    }
}

/// One favorites or watchlist collection.
///
/// Every read-modify-write and its storage write happen under one
/// synchronous lock that is never held across an await.
pub struct ListState {
    kind: ListKind,
    storage: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListState")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ListState {
    /// Creates the list seeded from durable storage.
    ///
    /// Unreadable stored data is logged and replaced with an empty list.
    pub fn new(kind: ListKind, storage: Arc<dyn KeyValueStore>) -> Self {
        let items = match read_json::<Vec<ListItem>>(storage.as_ref(), kind.as_str()) {
            Ok(items) => dedup(items.unwrap_or_default()),
            Err(e) => {
                tracing::warn!(list = %kind, "ignoring unreadable stored list: {e:#}");
                Vec::new()
            }
        };
        Self {
            kind,
            storage,
            inner: Mutex::new(Inner {
                items,
                phase: ListPhase::Idle,
                error: None,
                seq: 0,
                generation: 0,
                touched: HashMap::new(),
                open: BTreeMap::new(),
            }),
        }
    }

    /// Which list this is.
    #[must_use]
    pub const fn kind(&self) -> ListKind {
        self.kind
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &[ListItem]) {
        if let Err(e) = write_json(self.storage.as_ref(), self.kind.as_str(), items) {
            tracing::warn!(list = %self.kind, "failed to persist list: {e:#}");
        }
    }

    /// Current items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<ListItem> {
        self.lock().items.clone()
    }

    /// Current items, phase and error.
    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot {
        let inner = self.lock();
        ListSnapshot {
            items: inner.items.clone(),
            phase: inner.phase,
            error: inner.error.clone(),
        }
    }

    /// Whether `ticket` was issued since the last `clear()`.
    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.lock().is_current(ticket)
    }

    /// Marks a fetch as started.
    pub(crate) fn begin_fetch(&self) -> Ticket {
        let mut inner = self.lock();
        inner.phase = ListPhase::Loading;
        let seq = inner.seq;
        inner.issue(seq, None)
    }

    /// Adds `item` locally. An existing entry with the same ID is updated in place.
    pub(crate) fn begin_add(&self, item: ListItem) -> Ticket {
        let mut inner = self.lock();
        inner.seq = inner.seq.saturating_add(1);
        let seq = inner.seq;
        let id = item.id;
        if let Some(existing) = inner.items.iter_mut().find(|i| i.id == id) {
            *existing = item;
        } else {
            inner.items.push(item);
        }
        inner.touched.insert(
            id,
            Touch {
                seq,
                op: LocalOp::Added,
                in_flight: true,
            },
        );
        inner.phase = ListPhase::Mutating;
        self.persist(&inner.items);
        inner.issue(seq, Some(id))
    }

    /// Removes `id` locally. An absent ID leaves the items unchanged.
    pub(crate) fn begin_remove(&self, id: u64) -> Ticket {
        let mut inner = self.lock();
        inner.seq = inner.seq.saturating_add(1);
        let seq = inner.seq;
        let before = inner.items.len();
        inner.items.retain(|item| item.id != id);
        inner.touched.insert(
            id,
            Touch {
                seq,
                op: LocalOp::Removed,
                in_flight: true,
            },
        );
        inner.phase = ListPhase::Mutating;
        if inner.items.len() != before {
            self.persist(&inner.items);
        }
        inner.issue(seq, Some(id))
    }

    /// Replaces the list with the remote copy, keeping local changes made
    /// while the fetch was in flight.
    pub(crate) fn finish_fetch(&self, ticket: Ticket, remote: Vec<ListItem>) -> Vec<ListItem> {
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return inner.items.clone();
        }
        let mut merged: Vec<ListItem> = dedup(remote)
            .into_iter()
            .filter(|item| !inner.suppressed(item.id, ticket))
            .collect();
        for item in &inner.items {
            if inner.pending_add(item.id, ticket) && !merged.iter().any(|m| m.id == item.id) {
                merged.push(item.clone());
            }
        }
        inner.items = merged;
        inner.settle(ticket);
        inner.phase = ListPhase::Loaded;
        inner.error = None;
        self.persist(&inner.items);
        inner.items.clone()
    }

    /// Ends a fetch without changing the items.
    pub(crate) fn keep_local(&self, ticket: Ticket) -> Vec<ListItem> {
        let mut inner = self.lock();
        if inner.is_current(ticket) {
            inner.settle(ticket);
            inner.phase = ListPhase::Loaded;
            inner.error = None;
        }
        inner.items.clone()
    }

    /// Ends a mutation, merging the remote list if one was returned.
    ///
    /// Remote entries replace local ones with the same ID; remote-only
    /// entries are appended unless they were removed locally after the
    /// mutation started.
    pub(crate) fn finish_mutation(
        &self,
        ticket: Ticket,
        remote: Option<Vec<ListItem>>,
    ) -> Vec<ListItem> {
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return inner.items.clone();
        }
        if let Some(remote) = remote {
            let mut changed = false;
            for item in dedup(remote) {
                if inner.suppressed(item.id, ticket) {
                    continue;
                }
                if let Some(existing) = inner.items.iter_mut().find(|i| i.id == item.id) {
                    if *existing != item {
                        *existing = item;
                        changed = true;
                    }
                } else {
                    inner.items.push(item);
                    changed = true;
                }
            }
            if changed {
                self.persist(&inner.items);
            }
        }
        inner.settle(ticket);
        inner.phase = ListPhase::Applied;
        inner.error = None;
        inner.items.clone()
    }

    /// Records a remote failure. Local items stay as they are.
    pub(crate) fn fail(&self, ticket: Ticket, warning: SyncWarning) -> Vec<ListItem> {
        let mut inner = self.lock();
        if inner.is_current(ticket) {
            inner.settle(ticket);
            inner.phase = ListPhase::Failed;
            inner.error = Some(warning);
        }
        inner.items.clone()
    }

    /// Empties the list in memory and durable storage.
    ///
    /// Operations started before the call can no longer change the list.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.touched.clear();
        inner.open.clear();
        inner.error = None;
        inner.phase = ListPhase::Idle;
        inner.generation = inner.generation.wrapping_add(1);
        if let Err(e) = self.storage.remove(self.kind.as_str()) {
            tracing::warn!(list = %self.kind, "failed to remove stored list: {e:#}");
        }
    }

    /// Whether `id` is in the list.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.lock().contains(id)
    }

    #[cfg(test)]
    fn touched_len(&self) -> usize {
        self.lock().touched.len()
    }
}

/// Drops repeated IDs, keeping the first occurrence.
fn dedup(items: Vec<ListItem>) -> Vec<ListItem> {
    let mut out: Vec<ListItem> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|i| i.id == item.id) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use cinelist_api::backend::ErrorKind;
    use cinelist_db::MemoryStore;

    use super::*;

    fn item(id: u64) -> ListItem {
        ListItem::new(id, format!("Movie {id}"))
    }

    fn ids(items: &[ListItem]) -> Vec<u64> {
        items.iter().map(|i| i.id).collect()
    }

    fn new_state() -> (Arc<MemoryStore>, ListState) {
        let store = Arc::new(MemoryStore::new());
        let state = ListState::new(
            ListKind::Favorites,
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
        );
        (store, state)
    }

    fn stored_ids(store: &MemoryStore) -> Vec<u64> {
        let items: Vec<ListItem> = read_json(store, "favorites").unwrap().unwrap_or_default();
        ids(&items)
    }

    #[test]
    fn test_new_seeds_from_storage() {
        // Arrange
        let store = Arc::new(MemoryStore::new());
        write_json(store.as_ref(), "watchlist", &vec![item(1), item(2)]).unwrap();

        // Act
        let state = ListState::new(ListKind::Watchlist, store);

        // Assert
        assert_eq!(ids(&state.items()), vec![1, 2]);
        assert_eq!(state.snapshot().phase, ListPhase::Idle);
    }

    #[test]
    fn test_new_ignores_corrupt_storage() {
        // Arrange
        let store = Arc::new(MemoryStore::new());
        store.set("favorites", "{not json").unwrap();

        // Act
        let state = ListState::new(ListKind::Favorites, store);

        // Assert
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_repeated_add_keeps_one_entry() {
        // Arrange
        let (store, state) = new_state();

        // Act
        state.begin_add(item(5));
        state.begin_add(item(5));

        // Assert
        assert_eq!(ids(&state.items()), vec![5]);
        assert_eq!(stored_ids(&store), vec![5]);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        // Arrange
        let (_store, state) = new_state();
        let t = state.begin_add(item(1));
        state.finish_mutation(t, None);

        // Act
        let t = state.begin_remove(99);
        let items = state.finish_mutation(t, None);

        // Assert
        assert_eq!(ids(&items), vec![1]);
        assert!(state.snapshot().error.is_none());
    }

    #[test]
    fn test_finish_fetch_replaces_with_remote() {
        // Arrange
        let (store, state) = new_state();
        let t = state.begin_add(item(1));
        state.finish_mutation(t, None);
        let fetch = state.begin_fetch();

        // Act
        let items = state.finish_fetch(fetch, vec![item(2), item(3)]);

        // Assert
        assert_eq!(ids(&items), vec![2, 3]);
        assert_eq!(stored_ids(&store), vec![2, 3]);
        assert_eq!(state.snapshot().phase, ListPhase::Loaded);
    }

    #[test]
    fn test_finish_fetch_keeps_changes_made_during_fetch() {
        // Arrange
        let (_store, state) = new_state();
        let fetch = state.begin_fetch();
        state.begin_add(item(7));
        state.begin_remove(2);

        // Act
        let items = state.finish_fetch(fetch, vec![item(1), item(2)]);

        // Assert
        assert_eq!(ids(&items), vec![1, 7]);
    }

    #[test]
    fn test_mutation_merge_remote_wins_and_appends() {
        // Arrange
        let (_store, state) = new_state();
        let t = state.begin_add(item(1));
        let mut remote_one = item(1);
        remote_one.title = String::from("Remote title");

        // Act
        let items = state.finish_mutation(t, Some(vec![item(9), remote_one]));

        // Assert
        assert_eq!(ids(&items), vec![1, 9]);
        assert_eq!(items.first().unwrap().title, "Remote title");
        assert_eq!(state.snapshot().phase, ListPhase::Applied);
    }

    #[test]
    fn test_add_then_remove_before_resolution_stays_removed() {
        // Arrange
        let (store, state) = new_state();
        let add = state.begin_add(item(4));
        let remove = state.begin_remove(4);

        // Act
        state.finish_mutation(add, Some(vec![item(4)]));
        let items = state.finish_mutation(remove, Some(vec![item(4)]));

        // Assert
        assert!(items.is_empty());
        assert!(stored_ids(&store).is_empty());
    }

    #[test]
    fn test_fail_records_error_and_keeps_items() {
        // Arrange
        let (_store, state) = new_state();
        let t = state.begin_add(item(7));
        let warning = SyncWarning {
            kind: ErrorKind::TransientNetwork,
            message: String::from("network error: down"),
        };

        // Act
        let items = state.fail(t, warning.clone());

        // Assert
        assert_eq!(ids(&items), vec![7]);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, ListPhase::Failed);
        assert_eq!(snapshot.error, Some(warning));
    }

    #[test]
    fn test_clear_discards_stale_results() {
        // Arrange
        let (store, state) = new_state();
        let add = state.begin_add(item(1));
        let fetch = state.begin_fetch();

        // Act
        state.clear();
        state.finish_mutation(add, Some(vec![item(1), item(2)]));
        state.finish_fetch(fetch, vec![item(3)]);

        // Assert
        assert!(state.items().is_empty());
        assert!(store.get("favorites").unwrap().is_none());
        assert!(!state.is_current(add));
    }

    #[test]
    fn test_settled_mutations_are_forgotten() {
        // Arrange
        let (_store, state) = new_state();

        // Act
        for id in 1..=50 {
            let add = state.begin_add(item(id));
            state.finish_mutation(add, None);
            let remove = state.begin_remove(id);
            state.finish_mutation(remove, Some(Vec::new()));
        }

        // Assert
        assert!(state.items().is_empty());
        assert_eq!(state.touched_len(), 0);
    }

    #[test]
    fn test_settled_remove_is_kept_for_older_fetch() {
        // Arrange
        let (_store, state) = new_state();
        let fetch = state.begin_fetch();
        let remove = state.begin_remove(2);
        state.finish_mutation(remove, None);
        assert_eq!(state.touched_len(), 1);

        // Act
        let items = state.finish_fetch(fetch, vec![item(1), item(2)]);

        // Assert
        assert_eq!(ids(&items), vec![1]);
        assert_eq!(state.touched_len(), 0);
    }

    #[test]
    fn test_failed_mutation_is_forgotten() {
        // Arrange
        let (_store, state) = new_state();
        let add = state.begin_add(item(3));
        let warning = SyncWarning {
            kind: ErrorKind::TransientNetwork,
            message: String::from("network error: down"),
        };

        // Act
        state.fail(add, warning);

        // Assert
        assert_eq!(ids(&state.items()), vec![3]);
        assert_eq!(state.touched_len(), 0);
    }
}
