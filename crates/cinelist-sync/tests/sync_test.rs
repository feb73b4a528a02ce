#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use cinelist_api::backend::{
    BackendClient, Credentials, ErrorKind, ListItem, ListKind, TokenStore,
};
use cinelist_db::{KeyValueStore, MemoryStore};
use cinelist_sync::{SyncContext, bootstrap};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_BODY: &str =
    r#"{"token":"old","user":{"_id":"u1","fullName":"Anbu","email":"a@x.io"}}"#;

fn connect(server: &MockServer) -> (Arc<MemoryStore>, SyncContext<BackendClient>) {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::clone(&store) as Arc<dyn KeyValueStore>;
    let base_url = format!("{}/api/", server.uri()).parse().unwrap();
    let ctx = SyncContext::new(storage, move |session| {
        BackendClient::builder()
            .base_url(base_url)
            .user_agent("cinelist-test/0.0.0")
            .timeout(Duration::from_secs(2))
            .token_store(session as Arc<dyn TokenStore>)
            .build()
    })
    .unwrap();
    (store, ctx)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_BODY))
        .mount(server)
        .await;
}

fn ids(items: &[ListItem]) -> Vec<u64> {
    items.iter().map(|i| i.id).collect()
}

#[tokio::test]
async fn test_login_then_background_fetch_uses_token() {
    // Arrange
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/favorites"))
        .and(header("authorization", "Bearer old"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"favorites":[{"id":11,"title":"Jailer"}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/watchlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"watchlist":[]}"#))
        .expect(1)
        .mount(&server)
        .await;
    let (_store, ctx) = connect(&server);

    // Act
    ctx.login(&Credentials::new("a@x.io", "secret1")).await.unwrap();
    ctx.settle().await;

    // Assert
    assert_eq!(ids(&ctx.list(ListKind::Favorites).state().items()), vec![11]);
    assert!(ctx.list(ListKind::Watchlist).state().items().is_empty());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    // Arrange
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/watchlist"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"jwt expired"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"new"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/watchlist"))
        .and(header("authorization", "Bearer new"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"watchlist":[{"id":5,"title":"Leo"}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (store, ctx) = connect(&server);
    ctx.auth()
        .login(&Credentials::new("a@x.io", "secret1"))
        .await
        .unwrap();

    // Act
    let synced = ctx.list(ListKind::Watchlist).fetch().await;

    // Assert
    assert!(synced.is_clean());
    assert_eq!(ids(&synced.value), vec![5]);
    assert_eq!(ctx.session().session().token.as_deref(), Some("new"));
    assert!(store.get("session").unwrap().unwrap().contains("\"new\""));
}

#[tokio::test]
async fn test_rejected_refresh_logs_out_and_clears_lists() {
    // Arrange
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"jwt expired"}"#))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"invalid"}"#))
        .expect(1)
        .mount(&server)
        .await;
    let (store, ctx) = connect(&server);
    ctx.auth()
        .login(&Credentials::new("a@x.io", "secret1"))
        .await
        .unwrap();

    // Act
    let synced = ctx
        .list(ListKind::Favorites)
        .add(ListItem::new(3, "Vikram"))
        .await;

    // Assert
    assert!(matches!(
        synced.warning.as_ref().map(|w| w.kind),
        Some(ErrorKind::SessionExpired)
    ));
    assert!(!ctx.session().is_authenticated());
    assert!(ctx.list(ListKind::Favorites).state().items().is_empty());
    assert!(store.get("session").unwrap().is_none());
    assert!(store.get("favorites").unwrap().is_none());
}

#[tokio::test]
async fn test_restart_restores_session_from_store() {
    // Arrange
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"favorites":[]}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/watchlist"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (store, first) = connect(&server);
    first
        .auth()
        .login(&Credentials::new("a@x.io", "secret1"))
        .await
        .unwrap();
    drop(first);

    let storage = Arc::clone(&store) as Arc<dyn KeyValueStore>;
    let base_url = format!("{}/api/", server.uri()).parse().unwrap();
    let ctx = SyncContext::new(storage, move |session| {
        BackendClient::builder()
            .base_url(base_url)
            .user_agent("cinelist-test/0.0.0")
            .token_store(session as Arc<dyn TokenStore>)
            .build()
    })
    .unwrap();

    // Act
    let session = bootstrap(&ctx);
    ctx.settle().await;

    // Assert
    assert!(session.is_authenticated);
    assert_eq!(session.user.unwrap().name, "Anbu");
    let watchlist = ctx.list(ListKind::Watchlist).state().snapshot();
    assert!(watchlist.error.is_some());
    assert!(ctx.session().is_authenticated());
}
