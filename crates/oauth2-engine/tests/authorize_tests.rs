//! Integration tests for the authorization endpoint.

mod common;

use std::sync::Arc;

use http::header::{AUTHORIZATION, LOCATION};

use common::*;
use oauth2_engine::config::AuthorizeOptions;
use oauth2_engine::{ErrorKind, Model, Request, Response};

fn authorize_options(user: Option<&str>) -> AuthorizeOptions<String> {
    AuthorizeOptions {
        authenticate_handler: Some(Arc::new(FixedUser(user.map(str::to_owned)))),
        ..AuthorizeOptions::default()
    }
}

fn authorize_request() -> Request {
    Request::get()
        .with_query("client_id", CLIENT_ID)
        .with_query("response_type", "code")
        .with_query("redirect_uri", REDIRECT_URI)
        .with_query("state", "foobar")
}

// ─── Success path ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_redirects_with_code_and_state() {
    let (server, store) = server().await;
    let mut response = Response::new();

    let code = server
        .authorize_with(&authorize_request(), &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap();

    assert_eq!(response.status_code(), 302);
    let query = location_query(&response);
    assert_eq!(query_value(&query, "code"), Some(code.authorization_code.as_str()));
    assert_eq!(query_value(&query, "state"), Some("foobar"));

    let stored = store.get_authorization_code(&code.authorization_code).await.unwrap().unwrap();
    assert_eq!(stored.user.as_deref(), Some(USERNAME));
    assert_eq!(stored.redirect_uri.as_deref(), Some(REDIRECT_URI));
    assert!(stored.code_challenge.is_none());
    assert!(stored.code_challenge_method.is_none());
}

#[tokio::test]
async fn test_existing_query_is_replaced() {
    let (server, store) = server().await;
    let with_query = "http://example.com/cb?session=stale";
    store
        .register_client(
            oauth2_engine::Client::new("q")
                .with_grants(["authorization_code"])
                .with_redirect_uris([with_query]),
            Some("s"),
        )
        .await;
    let request = Request::get()
        .with_query("client_id", "q")
        .with_query("response_type", "code")
        .with_query("state", "xyz");
    let mut response = Response::new();

    server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap();

    let query = location_query(&response);
    assert!(query_value(&query, "session").is_none());
    assert_eq!(query.len(), 2);
}

#[tokio::test]
async fn test_pkce_challenge_is_stored() {
    let (server, _) = server().await;
    let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
    let request = authorize_request()
        .with_query("code_challenge", challenge)
        .with_query("code_challenge_method", "S256");
    let mut response = Response::new();

    let code = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap();

    assert_eq!(code.code_challenge.as_deref(), Some(challenge));
    assert_eq!(code.code_challenge_method.as_deref(), Some("S256"));
}

#[tokio::test]
async fn test_pkce_method_defaults_to_plain() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("code_challenge", "a".repeat(43));
    let mut response = Response::new();

    let code = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap();
    assert_eq!(code.code_challenge_method.as_deref(), Some("plain"));
}

#[tokio::test]
async fn test_bearer_authenticated_user() {
    let (server, _) = server().await;
    let body = issue_password_token(&server, None).await;
    let token = body["access_token"].as_str().unwrap();
    let request = authorize_request().with_header(AUTHORIZATION, bearer(token));
    let mut response = Response::new();

    let code = server.authorize(&request, &mut response).await.unwrap();
    assert_eq!(code.user.as_deref(), Some(USERNAME));
}

// ─── Redirected failures ────────────────────────────────────────────────────

#[tokio::test]
async fn test_access_denied_redirect() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("allowed", "false");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert_eq!(response.status_code(), 302);
    let location = response.header(LOCATION).unwrap();
    assert!(location.starts_with("http://example.com/cb?error=access_denied&error_description="));
    assert!(location.ends_with("&state=foobar"));

    let query = location_query(&response);
    assert_eq!(
        query_value(&query, "error_description"),
        Some("Access denied: user denied access to application")
    );
}

#[tokio::test]
async fn test_unsupported_response_type_redirects() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("response_type", "token");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedResponseType);
    let query = location_query(&response);
    assert_eq!(query_value(&query, "error"), Some("unsupported_response_type"));
    assert_eq!(query_value(&query, "state"), Some("foobar"));
    assert!(query_value(&query, "code").is_none());
}

#[tokio::test]
async fn test_invalid_code_challenge_redirects() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("code_challenge", "too-short");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(response.status_code(), 302);
}

// ─── Failures before the redirect target is trusted ─────────────────────────

#[tokio::test]
async fn test_unknown_client_is_not_redirected() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("client_id", "ghost");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidClient);
    assert!(response.header(LOCATION).is_none());
}

#[tokio::test]
async fn test_unregistered_redirect_uri_is_not_redirected() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("redirect_uri", "http://evil.example/cb");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Invalid client: `redirect_uri` does not match client value");
    assert!(response.header(LOCATION).is_none());
}

#[tokio::test]
async fn test_missing_state_redirects_without_state() {
    let (server, _) = server().await;
    let mut request = authorize_request();
    request.query.remove("state");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Missing parameter: `state`");
    assert_eq!(response.status_code(), 302);
    let query = location_query(&response);
    assert_eq!(query_value(&query, "error"), Some("invalid_request"));
    assert!(query_value(&query, "state").is_none());
    assert!(query_value(&query, "code").is_none());
}

#[tokio::test]
async fn test_invalid_state_is_not_echoed() {
    let (server, _) = server().await;
    let request = authorize_request().with_query("state", "bad\u{7f}");
    let mut response = Response::new();

    let err = server
        .authorize_with(&request, &mut response, authorize_options(Some(USERNAME)))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Invalid parameter: `state`");
    assert_eq!(response.status_code(), 302);
    let query = location_query(&response);
    assert_eq!(query_value(&query, "error"), Some("invalid_request"));
    assert!(query_value(&query, "state").is_none());
}

#[tokio::test]
async fn test_empty_state_allowed() {
    let (server, _) = server().await;
    let mut request = authorize_request();
    request.query.remove("state");
    let options = AuthorizeOptions { allow_empty_state: true, ..authorize_options(Some(USERNAME)) };
    let mut response = Response::new();

    server.authorize_with(&request, &mut response, options).await.unwrap();
    assert!(query_value(&location_query(&response), "state").is_none());
}

#[tokio::test]
async fn test_authenticator_without_user_is_server_error() {
    let (server, _) = server().await;
    let mut response = Response::new();

    let err = server
        .authorize_with(&authorize_request(), &mut response, authorize_options(None))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert!(response.header(LOCATION).is_none());
}

#[tokio::test]
async fn test_unauthenticated_user_is_not_redirected() {
    let (server, _) = server().await;
    let mut response = Response::new();

    let err = server.authorize(&authorize_request(), &mut response).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnauthorizedRequest);
    assert!(response.header(LOCATION).is_none());
}
