//! OAuth2 Client entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth2_client")]
pub struct Model {
    /// Public client identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Argon2id PHC string of the client secret
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Human-readable client name shown on the consent screen
    pub name: String,
    pub description: Option<String>,
    /// JSON array of registered redirect URIs
    pub redirect_uris: String,
    /// Space-separated list of scopes (downstream products) the client may request
    pub scopes: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse redirect URIs from JSON string
    pub fn redirect_uris_list(&self) -> Vec<String> {
        serde_json::from_str(&self.redirect_uris).unwrap_or_default()
    }

    /// Parse scopes from space-separated string
    pub fn scopes_list(&self) -> Vec<String> {
        self.scopes.split_whitespace().map(String::from).collect()
    }

    /// Exact-match membership test against the registered redirect URIs.
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris_list()
            .iter()
            .any(|allowed| allowed == uri)
    }
}
