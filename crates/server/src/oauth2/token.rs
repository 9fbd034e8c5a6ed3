//! Token exchange: redeem an authorization code for a bearer token, once.

use crate::entity::{oauth2_authorization, oauth2_token};
use crate::error::OAuthError;
use crate::oauth2::secrets::hash_token;
use crate::oauth2::state::OAuth2State;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub scope: String,
}

/// Mark an authorization code used, if nobody did so first.
///
/// Returns `true` only for the caller whose update flipped `used_at` from
/// null. Every later call for the same code returns `false`.
pub async fn consume_code(db: &DatabaseConnection, code: &str) -> Result<bool, OAuthError> {
    let marked = oauth2_authorization::Entity::update_many()
        .col_expr(
            oauth2_authorization::Column::UsedAt,
            Expr::value(OffsetDateTime::now_utc()),
        )
        .filter(oauth2_authorization::Column::Code.eq(code))
        .filter(oauth2_authorization::Column::UsedAt.is_null())
        .exec(db)
        .await?;
    Ok(marked.rows_affected == 1)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Exchange an authorization code for an access token.
///
/// Check order matters: client authentication happens before the code is
/// looked up, so a caller with a wrong secret learns nothing about the code.
/// The code is marked used with a conditional update before the token is
/// created. If two requests race on one code, only the one whose update
/// matched a row gets a token. A failure after that point leaves the code
/// consumed.
#[tracing::instrument(skip(state, request), fields(client_id = ?request.client_id))]
pub async fn exchange(
    state: &OAuth2State,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    if request.grant_type.as_deref() != Some(GRANT_TYPE_AUTHORIZATION_CODE) {
        return Err(OAuthError::UnsupportedGrantType);
    }

    let (Some(code), Some(client_id), Some(client_secret), Some(redirect_uri)) = (
        present(request.code.as_deref()),
        present(request.client_id.as_deref()),
        present(request.client_secret.as_deref()),
        present(request.redirect_uri.as_deref()),
    ) else {
        return Err(OAuthError::invalid_request(
            "code, client_id, client_secret and redirect_uri are required",
        ));
    };

    if !state.registry.verify_secret(client_id, client_secret).await? {
        tracing::info!(client_id, "client authentication failed");
        return Err(OAuthError::InvalidClientCredentials);
    }

    let authorization = oauth2_authorization::Entity::find()
        .filter(oauth2_authorization::Column::Code.eq(code))
        .filter(oauth2_authorization::Column::ClientId.eq(client_id))
        .one(state.db.as_ref())
        .await?
        .ok_or(OAuthError::InvalidGrant("authorization code not found"))?;

    if authorization.is_used() {
        tracing::warn!(client_id, "authorization code replay rejected");
        return Err(OAuthError::InvalidGrant("authorization code already used"));
    }
    if authorization.is_expired() {
        return Err(OAuthError::InvalidGrant("authorization code expired"));
    }
    if authorization.redirect_uri != redirect_uri {
        return Err(OAuthError::InvalidGrant("redirect_uri mismatch"));
    }

    if !consume_code(state.db.as_ref(), code).await? {
        tracing::warn!(client_id, "authorization code redeemed concurrently");
        return Err(OAuthError::InvalidGrant("authorization code already used"));
    }

    let now = OffsetDateTime::now_utc();

    let access_token = state.generate_access_token()?;
    oauth2_token::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        token_hash: Set(hash_token(&access_token)),
        client_id: Set(authorization.client_id.clone()),
        user_id: Set(authorization.user_id.clone()),
        scope: Set(authorization.scope.clone()),
        created_at: Set(now),
        expires_at: Set(now + time::Duration::seconds(state.access_token_lifetime)),
        revoked_at: Set(None),
    }
    .insert(state.db.as_ref())
    .await
    .map_err(|e| {
        tracing::error!(client_id, error = %e, "Failed to store token; authorization code stays consumed");
        OAuthError::from(e)
    })?;

    tracing::info!(
        client_id,
        user_id = %authorization.user_id,
        "issued access token"
    );

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.access_token_lifetime,
        scope: authorization.scope,
    })
}
