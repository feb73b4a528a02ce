//! In-memory backend for unit tests.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cinelist_api::backend::{
    ApiError, BackendApi, Credentials, ListItem, ListKind, LoginResponse, PictureUpload,
    ProfilePatch, Registration, User,
};
use cinelist_db::{KeyValueStore, MemoryStore};
use tokio::sync::Notify;

use crate::context::SyncContext;

pub fn item(id: u64) -> ListItem {
    ListItem::new(id, format!("Movie {id}"))
}

pub fn ids(items: &[ListItem]) -> Vec<u64> {
    items.iter().map(|i| i.id).collect()
}

pub fn user(id: &str) -> User {
    serde_json::from_value(serde_json::json!({"id": id, "name": "Anbu", "email": "a@x.io"}))
        .unwrap()
}

/// Simulated backend holding the server-side lists.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub lists: Mutex<HashMap<ListKind, Vec<ListItem>>>,
    /// Every list call fails with this error while set.
    pub list_error: Mutex<Option<ApiError>>,
    /// Accept adds without storing them.
    pub drop_adds: AtomicBool,
    /// Hold `add_item` until `release` is notified; `entered` fires first.
    pub gate_adds: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    pub login_result: Mutex<Option<Result<LoginResponse, ApiError>>>,
    pub profile_result: Mutex<Option<Result<User, ApiError>>>,
    pub refresh_result: Mutex<Option<Result<String, ApiError>>>,
    pub list_calls: AtomicU32,
    pub add_calls: AtomicU32,
    pub remove_calls: AtomicU32,
    pub register_calls: AtomicU32,
}

impl FakeBackend {
    pub fn with_remote(kind: ListKind, items: Vec<ListItem>) -> Self {
        let backend = Self::default();
        backend.lists.lock().unwrap().insert(kind, items);
        backend
    }

    pub fn remote(&self, kind: ListKind) -> Vec<ListItem> {
        self.lists
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_lists(&self, err: ApiError) {
        *self.list_error.lock().unwrap() = Some(err);
    }

    fn list_error(&self) -> Option<ApiError> {
        self.list_error.lock().unwrap().clone()
    }

    pub fn calls(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

fn scripted<T: Clone>(slot: &Mutex<Option<Result<T, ApiError>>>) -> Result<T, ApiError> {
    slot.lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| Err(ApiError::Transient(String::from("not scripted"))))
}

impl BackendApi for FakeBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        scripted(&self.login_result)
    }

    async fn register(&self, _registration: &Registration) -> Result<(), ApiError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_token(&self) -> Result<String, ApiError> {
        scripted(&self.refresh_result)
    }

    async fn update_profile(&self, _patch: &ProfilePatch) -> Result<User, ApiError> {
        scripted(&self.profile_result)
    }

    async fn upload_profile_picture(&self, _upload: &PictureUpload) -> Result<User, ApiError> {
        scripted(&self.profile_result)
    }

    async fn list_items(&self, kind: ListKind) -> Result<Vec<ListItem>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error() {
            return Err(err);
        }
        Ok(self.remote(kind))
    }

    async fn add_item(&self, kind: ListKind, item: &ListItem) -> Result<Vec<ListItem>, ApiError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.gate_adds.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if let Some(err) = self.list_error() {
            return Err(err);
        }
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(kind).or_default();
        if !self.drop_adds.load(Ordering::SeqCst) && !list.iter().any(|i| i.id == item.id) {
            list.push(item.clone());
        }
        Ok(list.clone())
    }

    async fn remove_item(&self, kind: ListKind, id: u64) -> Result<Vec<ListItem>, ApiError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error() {
            return Err(err);
        }
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(kind).or_default();
        if !list.iter().any(|i| i.id == id) {
            return Err(ApiError::Rejected {
                status: 404,
                message: String::from("Movie not found in list"),
            });
        }
        list.retain(|i| i.id != id);
        Ok(list.clone())
    }
}

/// Context over a fresh in-memory store, optionally logged in as `u1`.
pub fn context(
    backend: FakeBackend,
    logged_in: bool,
) -> (Arc<MemoryStore>, SyncContext<FakeBackend>) {
    context_over(Arc::new(MemoryStore::new()), backend, logged_in)
}

/// Context over an existing store.
pub fn context_over(
    store: Arc<MemoryStore>,
    backend: FakeBackend,
    logged_in: bool,
) -> (Arc<MemoryStore>, SyncContext<FakeBackend>) {
    let storage = Arc::clone(&store) as Arc<dyn KeyValueStore>;
    let ctx = SyncContext::new(storage, move |_session| Ok(backend)).unwrap();
    if logged_in {
        ctx.session().establish(String::from("tok"), user("u1"));
    }
    (store, ctx)
}
