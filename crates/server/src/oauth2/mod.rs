//! OAuth2 Authorization Server module.
//!
//! Implements the Authorization Code grant for the member portal. Third-party
//! clients send members here to approve access, redeem the resulting code for
//! a bearer token, and read the member's profile with that token.
//!
//! ## Components
//!
//! - [`registrar`] - client registry (active clients, redirect URIs, secrets)
//! - [`authorize`] - consent step and authorization code issuance
//! - [`token`] - single-use code redemption and access token issuance
//! - [`userinfo`] - bearer token to profile claims
//!
//! ## Endpoints
//!
//! - `GET /authorize` - Validate a request, return consent metadata
//! - `POST /authorize` - Submit the consent decision
//! - `POST /authorize/token` - Token endpoint
//! - `GET /authorize/userinfo` - UserInfo
//! - `GET /.well-known/oauth-authorization-server` - Server metadata

pub mod authorize;
pub mod endpoints;
pub mod registrar;
pub mod secrets;
pub mod session;
mod state;
pub mod token;
pub mod userinfo;

pub use endpoints::router;
pub use registrar::{ClientRegistry, NewClient};
pub use session::{SessionUser, issue_session_token};
pub use state::OAuth2State;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";
