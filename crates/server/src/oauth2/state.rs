//! OAuth2 state management.
//!
//! Provides the state handed to every OAuth2 handler. All persistent state
//! lives in the database; this struct only carries the injected connection and
//! settings.

use crate::config::AppConfig;
use crate::error::OAuthError;
use crate::oauth2::registrar::ClientRegistry;
use crate::oauth2::secrets::{RANDOM_VALUE_LENGTH, generate_alphanumeric};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// OAuth2 state containing all components needed for the authorization server.
#[derive(Clone)]
pub struct OAuth2State {
    pub registry: ClientRegistry,
    pub db: Arc<DatabaseConnection>,
    /// Base URL for the OAuth2 server (used in discovery metadata)
    pub issuer_url: String,
    /// Path the OAuth2 routes are mounted under
    pub route_prefix: String,
    /// Secret the portal signs session tokens with
    pub session_secret: String,
    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,
    /// Authorization code lifetime in seconds
    pub authorization_code_lifetime: i64,
    pub access_token_prefix: String,
}

impl OAuth2State {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            registry: ClientRegistry::new(db.clone()),
            db,
            issuer_url: config.issuer_url.trim_end_matches('/').to_string(),
            route_prefix: config.oauth2.route_prefix.trim_end_matches('/').to_string(),
            session_secret: config.session_secret.clone(),
            access_token_lifetime: config.oauth2.access_token_lifetime,
            authorization_code_lifetime: config.oauth2.authorization_code_lifetime,
            access_token_prefix: config.oauth2.access_token_prefix.clone(),
        }
    }

    /// Generate a fresh authorization code.
    pub fn generate_code() -> Result<String, OAuthError> {
        generate_alphanumeric(RANDOM_VALUE_LENGTH)
            .map_err(|e| OAuthError::Server(format!("random source failed: {e}")))
    }

    /// Generate a fresh access token carrying the configured prefix.
    pub fn generate_access_token(&self) -> Result<String, OAuthError> {
        let random = generate_alphanumeric(RANDOM_VALUE_LENGTH)
            .map_err(|e| OAuthError::Server(format!("random source failed: {e}")))?;
        Ok(format!("{}{}", self.access_token_prefix, random))
    }
}
