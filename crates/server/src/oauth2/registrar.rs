//! Database-backed OAuth2 client registry.
//!
//! Answers whether a client exists and is active, whether a redirect URI is
//! registered for it, and whether a supplied secret is correct.

use crate::entity::oauth2_client;
use crate::error::OAuthError;
use crate::oauth2::secrets::{
    RANDOM_VALUE_LENGTH, generate_alphanumeric, hash_secret, verify_secret_hash,
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use std::sync::{Arc, LazyLock};
use time::OffsetDateTime;

/// Hash checked for unknown clients. Its secret is random and never kept.
static DUMMY_SECRET_HASH: LazyLock<String> = LazyLock::new(|| {
    generate_alphanumeric(RANDOM_VALUE_LENGTH)
        .ok()
        .and_then(|secret| hash_secret(&secret).ok())
        .unwrap_or_default()
});

/// Data needed to register a new client.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
}

#[derive(Clone)]
pub struct ClientRegistry {
    db: Arc<DatabaseConnection>,
}

impl ClientRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Fetch a client, treating inactive clients as unknown.
    pub async fn lookup_active_client(
        &self,
        client_id: &str,
    ) -> Result<oauth2_client::Model, OAuthError> {
        match oauth2_client::Entity::find_by_id(client_id)
            .one(self.db.as_ref())
            .await?
        {
            Some(client) if client.is_active => Ok(client),
            Some(_) => {
                tracing::debug!(client_id, "client is deactivated");
                Err(OAuthError::InvalidClient)
            }
            None => Err(OAuthError::InvalidClient),
        }
    }

    /// Check the supplied secret against the stored hash of an active client.
    ///
    /// Unknown and inactive clients never verify, but still pay for one
    /// Argon2 run so response timing does not reveal which ids exist.
    pub async fn verify_secret(
        &self,
        client_id: &str,
        supplied_secret: &str,
    ) -> Result<bool, OAuthError> {
        let (hash, known) = match self.lookup_active_client(client_id).await {
            Ok(c) => (c.secret_hash, true),
            Err(OAuthError::InvalidClient) => (DUMMY_SECRET_HASH.clone(), false),
            Err(e) => return Err(e),
        };
        let secret = supplied_secret.to_owned();
        // Argon2 verification is CPU bound
        let matches = tokio::task::spawn_blocking(move || verify_secret_hash(&secret, &hash))
            .await
            .map_err(|e| OAuthError::Server(format!("secret verification task failed: {e}")))?;
        Ok(known && matches)
    }

    /// Register a client. Returns the stored record and the plaintext secret,
    /// which is not recoverable afterwards.
    pub async fn register_client(
        &self,
        new: NewClient,
    ) -> Result<(oauth2_client::Model, String), OAuthError> {
        if let Some(bad) = new
            .redirect_uris
            .iter()
            .find(|uri| url::Url::parse(uri).is_err())
        {
            return Err(OAuthError::invalid_request(format!(
                "redirect_uri {bad:?} is not an absolute URL"
            )));
        }
        let secret = generate_alphanumeric(RANDOM_VALUE_LENGTH)
            .map_err(|e| OAuthError::Server(format!("random source failed: {e}")))?;
        let secret_hash = hash_secret(&secret)
            .map_err(|e| OAuthError::Server(format!("secret hashing failed: {e}")))?;
        let redirect_uris = serde_json::to_string(&new.redirect_uris)
            .map_err(|e| OAuthError::Server(format!("redirect uri encoding failed: {e}")))?;

        let now = OffsetDateTime::now_utc();
        let client = oauth2_client::ActiveModel {
            id: Set(new.id),
            secret_hash: Set(secret_hash),
            name: Set(new.name),
            description: Set(new.description),
            redirect_uris: Set(redirect_uris),
            scopes: Set(new.scopes.join(" ")),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;

        tracing::info!(client_id = %client.id, "registered OAuth2 client");
        Ok((client, secret))
    }

    /// Deactivate a client. Returns false if it does not exist.
    pub async fn deactivate_client(&self, client_id: &str) -> Result<bool, OAuthError> {
        let Some(client) = oauth2_client::Entity::find_by_id(client_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(false);
        };
        let mut active: oauth2_client::ActiveModel = client.into();
        active.is_active = Set(false);
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(self.db.as_ref()).await?;
        tracing::info!(client_id, "deactivated OAuth2 client");
        Ok(true)
    }
}

/// Exact-match membership of `redirect_uri` in the client's registered set.
pub fn verify_redirect_uri(client: &oauth2_client::Model, redirect_uri: &str) -> bool {
    client.is_redirect_uri_allowed(redirect_uri)
}

/// Scope granted for a request, given the scopes the client may use.
///
/// Unknown scopes are dropped. If nothing remains, or nothing was requested,
/// the client's full allowed list is used. Clients without an allowed list
/// get the requested scope verbatim.
pub fn negotiate_scope(client: &oauth2_client::Model, requested: Option<&str>) -> String {
    let allowed = client.scopes_list();
    let requested = requested.map(str::trim).filter(|s| !s.is_empty());
    if allowed.is_empty() {
        return requested.unwrap_or_default().to_string();
    }
    let Some(requested) = requested else {
        return allowed.join(" ");
    };
    let mut granted: Vec<&str> = Vec::new();
    for scope in requested.split_whitespace() {
        if allowed.iter().any(|a| a == scope) && !granted.contains(&scope) {
            granted.push(scope);
        }
    }
    if granted.is_empty() {
        allowed.join(" ")
    } else {
        granted.join(" ")
    }
}
