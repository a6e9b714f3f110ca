//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderValue;
use http::header::AUTHORIZATION;
use tracing_subscriber::EnvFilter;

use oauth2_engine::config::EngineConfig;
use oauth2_engine::handlers::AuthenticateUser;
use oauth2_engine::store::MemoryStore;
use oauth2_engine::{Client, OAuth2Server, OAuthResult, Request, Response};

pub const CLIENT_ID: &str = "app";
pub const CLIENT_SECRET: &str = "secret";
pub const OTHER_CLIENT_ID: &str = "other";
pub const REDIRECT_URI: &str = "http://example.com/cb";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "wonderland";

/// Store with a confidential client allowed every built-in grant, a second
/// client, one user and a service user for `client_credentials`.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .register_client(
            Client::new(CLIENT_ID)
                .with_grants([
                    "authorization_code",
                    "client_credentials",
                    "password",
                    "refresh_token",
                ])
                .with_redirect_uris([REDIRECT_URI]),
            Some(CLIENT_SECRET),
        )
        .await;
    store
        .register_client(
            Client::new(OTHER_CLIENT_ID)
                .with_grants(["password"])
                .with_redirect_uris([REDIRECT_URI]),
            Some(CLIENT_SECRET),
        )
        .await;
    store.register_user(USERNAME, PASSWORD).await;
    store.set_service_user(CLIENT_ID, "app-service").await;
    store
}

pub async fn server() -> (OAuth2Server<MemoryStore>, Arc<MemoryStore>) {
    server_with(EngineConfig::default()).await
}

/// Route engine logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn server_with(
    config: EngineConfig<String>,
) -> (OAuth2Server<MemoryStore>, Arc<MemoryStore>) {
    init_tracing();
    let store = seeded_store().await;
    let server = OAuth2Server::new(Arc::clone(&store), config).expect("valid config");
    (server, store)
}

pub fn basic(id: &str, secret: &str) -> HeaderValue {
    let encoded = STANDARD.encode(format!("{id}:{secret}"));
    HeaderValue::from_str(&format!("Basic {encoded}")).expect("ascii header")
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).expect("ascii header")
}

/// Password grant request for the seeded client and user.
pub fn password_request(scope: Option<&str>) -> Request {
    let mut request = Request::post_form([
        ("grant_type", "password"),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
        ("username", USERNAME),
        ("password", PASSWORD),
    ]);
    if let Some(scope) = scope {
        request = request.with_body("scope", scope);
    }
    request
}

/// Issue a token through the password grant and return the response body.
pub async fn issue_password_token(
    server: &OAuth2Server<MemoryStore>,
    scope: Option<&str>,
) -> serde_json::Value {
    let mut response = Response::new();
    server.token(&password_request(scope), &mut response).await.expect("token issued");
    response.body.expect("token body")
}

pub fn with_basic(request: Request, id: &str, secret: &str) -> Request {
    request.with_header(AUTHORIZATION, basic(id, secret))
}

/// Resource owner resolution that always yields the same user.
pub struct FixedUser(pub Option<String>);

#[async_trait]
impl AuthenticateUser<String> for FixedUser {
    async fn authenticate_user(
        &self,
        _request: &Request,
        _response: &mut Response,
    ) -> OAuthResult<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Query parameters of a redirect `Location`.
pub fn location_query(response: &Response) -> Vec<(String, String)> {
    let location = response.header(http::header::LOCATION).expect("Location header");
    let url = url::Url::parse(location).expect("absolute Location");
    url.query_pairs().into_owned().collect()
}

pub fn query_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
}
