//! Integration tests for bearer token authentication.

mod common;

use chrono::{TimeDelta, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, Method};

use common::*;
use oauth2_engine::config::{AuthenticateOptions, EngineConfig};
use oauth2_engine::store::MemoryStore;
use oauth2_engine::{Client, ErrorKind, Model, OAuth2Server, Request, Response, Token};

async fn access_token(server: &OAuth2Server<MemoryStore>) -> String {
    let body = issue_password_token(server, Some("read write")).await;
    body["access_token"].as_str().unwrap().to_owned()
}

// ─── Token sources ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authorization_header() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let request = Request::get().with_header(AUTHORIZATION, bearer(&token));
    let mut response = Response::new();

    let authenticated = server.authenticate(&request, &mut response).await.unwrap();
    assert_eq!(authenticated.user.as_deref(), Some(USERNAME));
    assert_eq!(authenticated.client_id(), Some(CLIENT_ID));
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_form_body_token() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let request = Request::post_form([("access_token", token.as_str())]);
    let mut response = Response::new();

    assert!(server.authenticate(&request, &mut response).await.is_ok());
}

#[tokio::test]
async fn test_body_token_requires_form_content() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let request = Request::new(Method::POST)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body("access_token", token);
    let mut response = Response::new();

    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_query_token_only_when_allowed() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let request = Request::get().with_query("access_token", token.as_str());

    let mut response = Response::new();
    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.message(), "Invalid request: do not send bearer tokens in query URLs");
    assert_eq!(
        response.header(WWW_AUTHENTICATE),
        Some("Bearer realm=\"Service\",error=\"invalid_request\"")
    );

    let options = AuthenticateOptions {
        allow_bearer_tokens_in_query_string: true,
        ..AuthenticateOptions::default()
    };
    let mut response = Response::new();
    assert!(server.authenticate_with(&request, &mut response, options).await.is_ok());
}

#[tokio::test]
async fn test_exactly_one_source_regardless_of_pair() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let options = AuthenticateOptions {
        allow_bearer_tokens_in_query_string: true,
        ..AuthenticateOptions::default()
    };

    let header_and_query = Request::post_form::<&str, &str>([])
        .with_header(AUTHORIZATION, bearer(&token))
        .with_query("access_token", token.as_str());
    let header_and_body = Request::post_form([("access_token", token.as_str())])
        .with_header(AUTHORIZATION, bearer(&token));
    let query_and_body = Request::post_form([("access_token", token.as_str())])
        .with_query("access_token", token.as_str());

    for request in [header_and_query, header_and_body, query_and_body] {
        let mut response = Response::new();
        let err = server
            .authenticate_with(&request, &mut response, options.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "Invalid request: only one authentication method is allowed");
    }
}

#[tokio::test]
async fn test_no_credentials_challenge() {
    let (server, _) = server().await;
    let mut response = Response::new();

    let err = server.authenticate(&Request::get(), &mut response).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedRequest);
    assert_eq!(response.status_code(), 401);
    assert_eq!(response.header(WWW_AUTHENTICATE), Some("Bearer realm=\"Service\""));
}

// ─── Token validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_token() {
    let (server, _) = server().await;
    let request = Request::get().with_header(AUTHORIZATION, bearer("does-not-exist"));
    let mut response = Response::new();

    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);
    assert_eq!(response.status_code(), 401);
    assert_eq!(
        response.header(WWW_AUTHENTICATE),
        Some("Bearer realm=\"Service\",error=\"invalid_token\"")
    );
}

#[tokio::test]
async fn test_expired_token() {
    let (server, store) = server().await;
    let mut token = Token::new("expired-token");
    token.access_token_expires_at = Some(Utc::now() - TimeDelta::seconds(5));
    store.save_token(token, &Client::new(CLIENT_ID), &USERNAME.to_string()).await.unwrap();

    let request = Request::get().with_header(AUTHORIZATION, bearer("expired-token"));
    let mut response = Response::new();

    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.message(), "Invalid token: access token has expired");
}

#[tokio::test]
async fn test_token_without_expiry_is_server_error() {
    let (server, store) = server().await;
    store
        .save_token(Token::new("no-expiry"), &Client::new(CLIENT_ID), &USERNAME.to_string())
        .await
        .unwrap();

    let request = Request::get().with_header(AUTHORIZATION, bearer("no-expiry"));
    let mut response = Response::new();

    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert!(response.header(WWW_AUTHENTICATE).is_none());
}

// ─── Scope ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scope_headers() {
    let (server, _) = server().await;
    let token = access_token(&server).await;
    let request = Request::get().with_header(AUTHORIZATION, bearer(&token));
    let mut response = Response::new();

    server
        .authenticate_with(&request, &mut response, AuthenticateOptions::with_scope(["read"]))
        .await
        .unwrap();

    assert_eq!(response.header("x-accepted-oauth-scopes"), Some("read"));
    assert_eq!(response.header("x-oauth-scopes"), Some("read write"));
}

#[tokio::test]
async fn test_insufficient_scope() {
    let mut config = EngineConfig::default();
    config.authenticate = AuthenticateOptions::with_scope(["admin"]);
    let (server, _) = server_with(config).await;
    let token = access_token(&server).await;
    let request = Request::get().with_header(AUTHORIZATION, bearer(&token));
    let mut response = Response::new();

    let err = server.authenticate(&request, &mut response).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientScope);
    assert_eq!(response.status_code(), 403);
    assert_eq!(
        response.header(WWW_AUTHENTICATE),
        Some("Bearer realm=\"Service\",error=\"insufficient_scope\"")
    );
}
