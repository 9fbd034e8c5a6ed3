//! Member sessions presented to the authorization endpoint.
//!
//! The portal signs an HS256 JWT for each logged-in member. The consent UI
//! forwards it as `Authorization: Bearer <jwt>` so this server knows who is
//! approving or denying a request.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// JWT claims of a portal session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Member user id
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

/// The authenticated member behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

impl From<SessionClaims> for SessionUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// Sign a session token. Used by the portal side and by tests.
pub fn issue_session_token(
    secret: &str,
    user_id: &str,
    email: &str,
    lifetime: time::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (OffsetDateTime::now_utc() + lifetime).unix_timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a session token and return the member it names.
pub fn verify_session_token(secret: &str, token: &str) -> Option<SessionUser> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims.into())
}

/// Extract the credential of an `Authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent, not valid UTF-8, uses another
/// scheme, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
}

/// Resolve the session user from request headers, if any.
pub fn session_user(secret: &str, headers: &HeaderMap) -> Option<SessionUser> {
    let token = bearer_token(headers)?;
    let user = verify_session_token(secret, token);
    if user.is_none() {
        tracing::debug!("ignoring invalid or expired session token");
    }
    user
}
