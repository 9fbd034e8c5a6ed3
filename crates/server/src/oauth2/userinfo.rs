//! UserInfo resolution: bearer token to profile claims.

use crate::entity::{oauth2_token, oauth2_user};
use crate::error::OAuthError;
use crate::oauth2::secrets::{constant_time_eq, hash_token};
use crate::oauth2::state::OAuth2State;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    /// Display name, falling back to full name, then email
    pub name: String,
    pub picture: Option<String>,
    /// Unix timestamp of the last profile change
    pub updated_at: i64,
}

impl From<oauth2_user::Model> for UserInfoResponse {
    fn from(user: oauth2_user::Model) -> Self {
        Self {
            name: user.preferred_name(),
            sub: user.id,
            email: user.email,
            email_verified: user.email_verified,
            picture: user.avatar_url,
            updated_at: user.updated_at.unix_timestamp(),
        }
    }
}

/// Find the valid access token record for a presented raw token.
///
/// The lookup is an exact match on the indexed hash column; expired and
/// revoked records are treated as absent.
pub async fn find_valid_token(
    state: &OAuth2State,
    raw_token: &str,
) -> Result<oauth2_token::Model, OAuthError> {
    let token_hash = hash_token(raw_token);
    let token = oauth2_token::Entity::find()
        .filter(oauth2_token::Column::TokenHash.eq(&token_hash))
        .one(state.db.as_ref())
        .await?
        .filter(|t| constant_time_eq(&t.token_hash, &token_hash))
        .ok_or(OAuthError::InvalidToken)?;

    if !token.is_valid() {
        tracing::debug!(
            revoked = token.is_revoked(),
            expired = token.is_expired(),
            "rejected access token"
        );
        return Err(OAuthError::InvalidToken);
    }
    Ok(token)
}

/// Resolve the profile claims for a bearer token.
///
/// `bearer_token` is the credential from an `Authorization: Bearer` header,
/// `None` when the header was missing or used another scheme.
#[tracing::instrument(skip_all)]
pub async fn get_user_info(
    state: &OAuth2State,
    bearer_token: Option<&str>,
) -> Result<UserInfoResponse, OAuthError> {
    let raw_token = bearer_token.ok_or(OAuthError::InvalidToken)?;
    let token = find_valid_token(state, raw_token).await?;

    let user = oauth2_user::Entity::find_by_id(&token.user_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %token.user_id, "token refers to a missing user");
            OAuthError::UserNotFound
        })?;

    Ok(user.into())
}
