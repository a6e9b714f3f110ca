//! OAuth 2.0 Authorization Server Engine
//!
//! A transport-agnostic implementation of the OAuth 2.0 authorization server
//! protocol (RFC 6749), bearer token usage (RFC 6750), token revocation
//! (RFC 7009) and PKCE (RFC 7636). Storage is delegated to a caller-supplied
//! [`Model`]; the embedding HTTP layer converts its requests into
//! [`Request`] values and renders the filled-in [`Response`].
//!
//! # Features
//!
//! - **Grant types**: `authorization_code` (with PKCE), `client_credentials`,
//!   `password`, `refresh_token`, plus caller-defined extension grants
//! - **Endpoints**: token, authorize, authenticate (resource server), revoke
//! - **Error taxonomy**: every failure is an [`OAuthError`] with its RFC name
//!   and HTTP status
//! - **`memory-store`** (default): an in-memory [`Model`] for tests and prototyping
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oauth2_engine::config::EngineConfig;
//! use oauth2_engine::store::MemoryStore;
//! use oauth2_engine::{Client, OAuth2Server, Request, Response};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     store.register_client(Client::new("app").with_grants(["password"]), Some("secret")).await;
//!     store.register_user("alice", "wonderland").await;
//!
//!     let server = OAuth2Server::new(store, EngineConfig::from_env()?)?;
//!     let request = Request::post_form([
//!         ("grant_type", "password"),
//!         ("client_id", "app"),
//!         ("client_secret", "secret"),
//!         ("username", "alice"),
//!         ("password", "wonderland"),
//!     ]);
//!     let mut response = Response::new();
//!     server.token(&request, &mut response).await?;
//!     println!("{}", response.body.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod bearer;
pub mod config;
pub mod error;
pub mod grant_types;
pub mod handlers;
pub mod model;
pub mod pkce;
pub mod request;
pub mod response;
pub mod server;
#[cfg(feature = "memory-store")]
pub mod store;
pub mod types;
pub mod validator;

pub use config::EngineConfig;
pub use error::{ErrorKind, OAuthError, OAuthResult};
pub use model::Model;
pub use request::Request;
pub use response::Response;
pub use server::OAuth2Server;
pub use types::{AuthorizationCode, Client, RefreshToken, Scope, Token, TokenRef};
