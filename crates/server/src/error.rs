use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Failures of the authorization server, in OAuth 2.0 error vocabulary.
///
/// Each variant maps to a fixed `error` code and HTTP status. A user denying
/// consent is not represented here: that is a successful response carrying an
/// `access_denied` redirect.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("only the 'code' response type is supported")]
    UnsupportedResponseType,
    /// Unknown or inactive client during the authorization steps.
    #[error("unknown or inactive client")]
    InvalidClient,
    /// Client authentication failed at the token endpoint.
    #[error("client authentication failed")]
    InvalidClientCredentials,
    #[error("redirect_uri is not registered for this client")]
    InvalidRedirectUri,
    #[error("invalid grant: {0}")]
    InvalidGrant(&'static str),
    #[error("only the 'authorization_code' grant type is supported")]
    UnsupportedGrantType,
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid or expired access token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Unexpected failure. The detail is logged, never returned to the caller.
    #[error("server error: {0}")]
    Server(String),
}

impl OAuthError {
    /// The `error` field placed on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::InvalidClient | OAuthError::InvalidClientCredentials => "invalid_client",
            OAuthError::InvalidRedirectUri => "invalid_redirect_uri",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::Unauthorized => "unauthorized",
            OAuthError::InvalidToken => "invalid_token",
            OAuthError::UserNotFound => "user_not_found",
            OAuthError::MethodNotAllowed => "method_not_allowed",
            OAuthError::Server(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidRequest(_)
            | OAuthError::UnsupportedResponseType
            | OAuthError::InvalidClient
            | OAuthError::InvalidRedirectUri
            | OAuthError::InvalidGrant(_)
            | OAuthError::UnsupportedGrantType => StatusCode::BAD_REQUEST,
            OAuthError::InvalidClientCredentials
            | OAuthError::Unauthorized
            | OAuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            OAuthError::UserNotFound => StatusCode::NOT_FOUND,
            OAuthError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            OAuthError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        OAuthError::InvalidRequest(description.into())
    }

    fn description(&self) -> Option<String> {
        match self {
            OAuthError::Server(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for OAuthError {
    fn from(e: sea_orm::DbErr) -> Self {
        OAuthError::Server(format!("database error: {e}"))
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// OAuth error code (e.g. `invalid_grant`)
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&OAuthError> for ErrorResponse {
    fn from(e: &OAuthError) -> Self {
        Self {
            error: e.code().to_string(),
            error_description: e.description(),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if let OAuthError::Server(detail) = &self {
            tracing::error!(error = %detail, "request failed with server error");
        }
        (self.status(), Json(ErrorResponse::from(&self))).into_response()
    }
}
