//! `BackendClient` - backend API client implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::api::BackendApi;
use super::error::ApiError;
use super::token::TokenStore;
use super::types::{
    Credentials, ListItem, ListKind, LoginResponse, PictureUpload, ProfilePatch, RefreshResponse,
    Registration, User, UserResponse, parse_list_body,
};

/// Default base URL for the backend API.
const DEFAULT_BASE_URL: &str = "https://movie-backend-4-qrw2.onrender.com/api/";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh endpoint path, relative to the base URL.
const REFRESH_PATH: &str = "users/refresh-token";

/// Backend API client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct BackendClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Bearer token source; `None` sends every request unauthenticated.
    tokens: Option<Arc<dyn TokenStore>>,
}

/// Builder for `BackendClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct BackendClientBuilder {
    base_url: Option<Url>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    tokens: Option<Arc<dyn TokenStore>>,
}

impl BackendClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            timeout: None,
            tokens: None,
        }
    }

    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the per-request timeout (default: 10s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the bearer token source.
    #[must_use]
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<BackendClient> {
        let user_agent = self.user_agent.context("user_agent is required")?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            Url::parse(DEFAULT_BASE_URL).context("invalid default base URL")?
        };

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(BackendClient {
            http_client,
            base_url,
            tokens: self.tokens,
        })
    }
}

impl BackendClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> BackendClientBuilder {
        BackendClientBuilder::new()
    }

    fn join(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidInput(format!("invalid request path {path}: {e}")))
    }

    fn current_token(&self) -> Option<String> {
        self.tokens.as_ref().and_then(|store| store.token())
    }

    /// Sends a request without credentials and returns the body on success.
    async fn send_plain(&self, path: &str, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e, path))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e, path))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Sends a request with the bearer token attached.
    ///
    /// On the first 401 the token is refreshed and the request replayed once
    /// with the new token. A rejected refresh yields `SessionExpired`; any
    /// other refresh failure yields the original 401 as `Unauthorized`.
    #[instrument(skip_all)]
    async fn send_authed<F>(&self, path: &str, build: F) -> Result<String, ApiError>
    where
        F: Fn(&Client, Url) -> RequestBuilder + Send + Sync,
    {
        let url = self.join(path)?;
        let mut retried = false;
        loop {
            let mut request = build(&self.http_client, url.clone());
            if let Some(token) = self.current_token() {
                request = request.bearer_auth(token);
            }
            tracing::debug!(path, retried, "backend API request");

            let err = match self.send_plain(path, request).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };
            if !matches!(err, ApiError::Unauthorized(_)) || retried {
                return Err(err);
            }
            retried = true;

            tracing::info!(path, "access token rejected, refreshing");
            match self.refresh_session().await {
                Ok(_) => {}
                Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired),
                Err(refresh_err) => {
                    tracing::warn!(path, error = %refresh_err, "token refresh failed");
                    return Err(err);
                }
            }
        }
    }

    /// Exchanges the current token for a new one and stores it.
    ///
    /// 401/403 from the refresh endpoint expires the session.
    #[instrument(skip_all)]
    async fn refresh_session(&self) -> Result<String, ApiError> {
        let Some(current) = self.current_token() else {
            return Err(ApiError::NotAuthenticated);
        };
        let url = self.join(REFRESH_PATH)?;
        let request = self
            .http_client
            .post(url)
            .bearer_auth(current)
            .json(&serde_json::json!({}));

        let body = match self.send_plain(REFRESH_PATH, request).await {
            Ok(body) => body,
            Err(ApiError::Unauthorized(_) | ApiError::Rejected { status: 403, .. }) => {
                tracing::warn!("refresh token rejected, ending session");
                if let Some(store) = &self.tokens {
                    store.expire();
                }
                return Err(ApiError::SessionExpired);
            }
            Err(err) => return Err(err),
        };

        let parsed: RefreshResponse = decode(REFRESH_PATH, &body)?;
        let token = parsed
            .token
            .map(|t| String::from(t.trim()))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: String::from("refresh response did not include a token"),
            })?;

        if let Some(store) = &self.tokens {
            store.store_token(&token);
        }
        tracing::info!("access token refreshed");
        Ok(token)
    }

    async fn list_request<F>(
        &self,
        kind: ListKind,
        path: &str,
        build: F,
    ) -> Result<Vec<ListItem>, ApiError>
    where
        F: Fn(&Client, Url) -> RequestBuilder + Send + Sync,
    {
        let body = self.send_authed(path, build).await?;
        parse_list_body(kind, &body)
    }
}

/// Decodes a JSON body, mapping failures to `ApiError::Decode`.
fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
}

/// Builds the multipart file part; an unparsable MIME type is left unset.
fn picture_part(upload: &PictureUpload) -> Part {
    let part = || Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
    part().mime_str(&upload.mime_type).unwrap_or_else(|_| part())
}

/// Extracts the user from a `{ "user": ... }` response.
fn user_from(path: &str, body: &str) -> Result<User, ApiError> {
    let parsed: UserResponse = decode(path, body)?;
    parsed.user.ok_or_else(|| ApiError::Decode(format!("{path}: response has no user")))
}

impl BackendApi for BackendClient {
    #[instrument(skip_all)]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let path = "users/login";
        let url = self.join(path)?;
        let request = self.http_client.post(url).json(credentials);

        let body = self
            .send_plain(path, request)
            .await
            .map_err(ApiError::into_login_failure)?;
        let mut parsed: LoginResponse = decode(path, &body)?;
        parsed.token = parsed
            .token
            .map(|t| String::from(t.trim()))
            .filter(|t| !t.is_empty());
        if parsed.token.is_none() {
            return Err(ApiError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: String::from("login response did not include a token"),
            });
        }
        Ok(parsed)
    }

    #[instrument(skip_all)]
    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let path = "users/register";
        let url = self.join(path)?;
        let request = self.http_client.post(url).json(registration);
        self.send_plain(path, request).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self) -> Result<String, ApiError> {
        self.refresh_session().await
    }

    #[instrument(skip_all)]
    async fn update_profile(&self, patch: &ProfilePatch) -> Result<User, ApiError> {
        let path = "users/update";
        let body = self
            .send_authed(path, |client, url| client.put(url).json(patch))
            .await?;
        user_from(path, &body)
    }

    #[instrument(skip_all)]
    async fn upload_profile_picture(&self, upload: &PictureUpload) -> Result<User, ApiError> {
        let path = "users/profile-picture";
        let body = self
            .send_authed(path, |client, url| {
                client
                    .post(url)
                    .multipart(Form::new().part("profilePicture", picture_part(upload)))
            })
            .await?;
        user_from(path, &body)
    }

    #[instrument(skip_all, fields(kind = %kind))]
    async fn list_items(&self, kind: ListKind) -> Result<Vec<ListItem>, ApiError> {
        self.list_request(kind, kind.as_str(), |client, url| client.get(url))
            .await
    }

    #[instrument(skip_all, fields(kind = %kind, id = item.id))]
    async fn add_item(&self, kind: ListKind, item: &ListItem) -> Result<Vec<ListItem>, ApiError> {
        self.list_request(kind, kind.as_str(), |client, url| client.post(url).json(item))
            .await
    }

    #[instrument(skip_all, fields(kind = %kind, id = id))]
    async fn remove_item(&self, kind: ListKind, id: u64) -> Result<Vec<ListItem>, ApiError> {
        let path = format!("{kind}/{id}");
        self.list_request(kind, &path, |client, url| client.delete(url))
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use std::sync::Mutex;

    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::backend::AuthFailure;

    /// Token store that records refreshes and expiry.
    #[derive(Debug, Default)]
    struct FakeTokens {
        token: Mutex<Option<String>>,
        expired: Mutex<bool>,
    }

    impl FakeTokens {
        fn with_token(token: &str) -> Arc<Self> {
            Arc::new(Self {
                token: Mutex::new(Some(String::from(token))),
                expired: Mutex::new(false),
            })
        }

        fn expired(&self) -> bool {
            *self.expired.lock().unwrap()
        }
    }

    impl TokenStore for FakeTokens {
        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn store_token(&self, token: &str) {
            *self.token.lock().unwrap() = Some(String::from(token));
        }

        fn expire(&self) {
            *self.token.lock().unwrap() = None;
            *self.expired.lock().unwrap() = true;
        }
    }

    fn client_for(server: &MockServer, tokens: Option<Arc<FakeTokens>>) -> BackendClient {
        let mut builder = BackendClient::builder()
            .base_url(format!("{}/api/", server.uri()).parse().unwrap())
            .user_agent("test/0.0.0")
            .timeout(Duration::from_secs(2));
        if let Some(tokens) = tokens {
            builder = builder.token_store(tokens);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_builder_requires_user_agent() {
        // Arrange & Act
        let result = BackendClient::builder().build();

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("user_agent is required")
        );
    }

    #[test]
    fn test_builder_uses_default_base_url() {
        // Arrange & Act
        let client = BackendClient::builder()
            .user_agent("test/0.0.0")
            .build()
            .unwrap();

        // Assert
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_login_trims_token() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .and(body_json(serde_json::json!({"email":"a@x.io","password":"secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"token":"  abc  ","user":{"_id":"u1","fullName":"Anbu","email":"a@x.io"}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        // Act
        let response = client
            .login(&Credentials::new("a@x.io", "secret1"))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.token.as_deref(), Some("abc"));
        assert_eq!(response.user.unwrap().name, "Anbu");
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_invalid_credentials() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"message":"Invalid password"}"#),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        // Act
        let err = client
            .login(&Credentials::new("a@x.io", "bad"))
            .await
            .unwrap_err();

        // Assert
        assert_eq!(
            err,
            ApiError::AuthFailed {
                reason: AuthFailure::InvalidCredentials,
                message: String::from("Invalid password"),
            }
        );
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message":"User not found"}"#),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        // Act
        let err = client
            .login(&Credentials::new("ghost@x.io", "secret1"))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            ApiError::AuthFailed {
                reason: AuthFailure::UserNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_login_without_token_is_rejected() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"user":{"id":"1"}}"#))
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        // Act
        let err = client
            .login(&Credentials::new("a@x.io", "secret1"))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_login_server_error_is_transient() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        // Act
        let err = client
            .login(&Credentials::new("a@x.io", "secret1"))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, ApiError::Transient(_)));
    }

    #[tokio::test]
    async fn test_list_items_attaches_bearer() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"favorites":[{"id":5,"title":"Jailer"}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("t1")));

        // Act
        let items = client.list_items(ListKind::Favorites).await.unwrap();

        // Assert
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Jailer");
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_replays_with_new_token() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/watchlist"))
            .and(header("Authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"jwt expired"}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/refresh-token"))
            .and(header("Authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"new"}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/watchlist"))
            .and(header("Authorization", "Bearer new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"watchlist":[{"id":9,"title":"Leo"}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        let tokens = FakeTokens::with_token("old");
        let client = client_for(&server, Some(Arc::clone(&tokens)));

        // Act
        let items = client.list_items(ListKind::Watchlist).await.unwrap();

        // Assert
        assert_eq!(items[0].id, 9);
        assert_eq!(tokens.token().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_second_401_does_not_refresh_again() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"new"}"#))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("old")));

        // Act
        let err = client.list_items(ListKind::Favorites).await.unwrap_err();

        // Assert
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_rejected_refresh_expires_session() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/refresh-token"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        let tokens = FakeTokens::with_token("old");
        let client = client_for(&server, Some(Arc::clone(&tokens)));

        // Act
        let err = client.list_items(ListKind::Favorites).await.unwrap_err();

        // Assert
        assert_eq!(err, ApiError::SessionExpired);
        assert!(tokens.expired());
    }

    #[tokio::test]
    async fn test_refresh_server_error_keeps_session_and_returns_original_401() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"expired"}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/refresh-token"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let tokens = FakeTokens::with_token("old");
        let client = client_for(&server, Some(Arc::clone(&tokens)));

        // Act
        let err = client.list_items(ListKind::Favorites).await.unwrap_err();

        // Assert
        assert_eq!(err, ApiError::Unauthorized(String::from("expired")));
        assert!(!tokens.expired());
        assert_eq!(tokens.token().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_refresh_token_network_failure_is_transient() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let tokens = FakeTokens::with_token("old");
        let client = BackendClient::builder()
            .base_url(format!("{}/api/", server.uri()).parse().unwrap())
            .user_agent("test/0.0.0")
            .timeout(Duration::from_millis(200))
            .token_store(Arc::clone(&tokens) as Arc<dyn TokenStore>)
            .build()
            .unwrap();

        // Act
        let err = client.refresh_token().await.unwrap_err();

        // Assert
        assert!(matches!(err, ApiError::Transient(_)));
        assert!(!tokens.expired());
    }

    #[tokio::test]
    async fn test_refresh_token_without_session_is_not_authenticated() {
        // Arrange
        let server = MockServer::start().await;
        let client = client_for(&server, None);

        // Act
        let err = client.refresh_token().await.unwrap_err();

        // Assert
        assert_eq!(err, ApiError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_request_without_token_is_sent_unauthenticated() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"message":"ok"}"#))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, None);
        let registration = Registration {
            full_name: String::from("Kavya"),
            email: String::from("k@x.io"),
            password: String::from("secret1"),
            confirm_password: String::from("secret1"),
        };

        // Act
        let result = client.register(&registration).await;

        // Assert
        assert!(result.is_ok());
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("Authorization").is_none());
    }

    #[tokio::test]
    async fn test_remove_item_404_is_not_found() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/favorites/7"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"message":"Movie not in favorites"}"#),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("t1")));

        // Act
        let err = client
            .remove_item(ListKind::Favorites, 7)
            .await
            .unwrap_err();

        // Assert
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_add_item_posts_item_and_returns_remote_list() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/watchlist"))
            .and(body_json(serde_json::json!({
                "id": 3,
                "title": "Master",
                "poster_path": null,
                "release_date": null,
                "vote_average": null,
                "overview": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"watchlist":[{"id":1,"title":"A"},{"id":3,"title":"Master"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("t1")));

        // Act
        let items = client
            .add_item(ListKind::Watchlist, &ListItem::new(3, "Master"))
            .await
            .unwrap();

        // Assert
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, 3);
    }

    #[tokio::test]
    async fn test_update_profile_returns_backend_user() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/users/update"))
            .and(body_json(serde_json::json!({"name":"New"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"message":"updated","user":{"_id":"u1","name":"New","email":"a@x.io"}}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("t1")));
        let patch = ProfilePatch {
            name: Some(String::from("New")),
            ..ProfilePatch::default()
        };

        // Act
        let user = client.update_profile(&patch).await.unwrap();

        // Assert
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "New");
    }

    #[tokio::test]
    async fn test_upload_profile_picture_sends_multipart() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/profile-picture"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"user":{"_id":"u1","profilePicture":"https://cdn.example/p.png"}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(FakeTokens::with_token("t1")));
        let upload = PictureUpload {
            file_name: String::from("p.png"),
            mime_type: String::from("image/png"),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };

        // Act
        let user = client.upload_profile_picture(&upload).await.unwrap();

        // Assert
        assert_eq!(
            user.profile_picture.as_deref(),
            Some("https://cdn.example/p.png")
        );
        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        assert!(String::from_utf8_lossy(&requests[0].body).contains("name=\"profilePicture\""));
    }
}
