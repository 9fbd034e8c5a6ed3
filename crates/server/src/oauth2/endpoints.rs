//! OAuth2 HTTP endpoints.
//!
//! Implements the authorization server endpoints:
//! - Authorization endpoint (consent metadata and consent decision)
//! - Token endpoint
//! - UserInfo
//! - Authorization server metadata

use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::authorize::{
    self, AuthorizationInfo, AuthorizeRequest, ConsentRequest, ConsentResponse,
};
use crate::oauth2::session::{bearer_token, session_user};
use crate::oauth2::token::{self, GRANT_TYPE_AUTHORIZATION_CODE, TokenRequest, TokenResponse};
use crate::oauth2::userinfo::{self, UserInfoResponse};
use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use axum::{
    Form, Json,
    extract::{
        FromRequest, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        HeaderMap,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use base64::Engine;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Creates the OAuth2 router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(authorize, authorize_decision))
        .routes(routes!(token))
        .routes(routes!(userinfo))
        .routes(routes!(authorization_server_metadata))
        .with_state(state)
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

/// Token request read from either a JSON or a form-encoded body.
///
/// Client credentials in an `Authorization: Basic` header take precedence over
/// the ones in the body.
pub struct TokenParams(pub TokenRequest);

impl<S> FromRequest<S> for TokenParams
where
    S: Send + Sync,
{
    type Rejection = OAuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let basic = basic_credentials(req.headers());

        let mut params = if is_form {
            Form::<TokenRequest>::from_request(req, state)
                .await
                .map(|Form(p)| p)
                .map_err(|e| OAuthError::invalid_request(e.body_text()))?
        } else {
            Json::<TokenRequest>::from_request(req, state)
                .await
                .map(|Json(p)| p)
                .map_err(|e| OAuthError::invalid_request(e.body_text()))?
        };

        if let Some((id, secret)) = basic {
            params.client_id = Some(id);
            params.client_secret = Some(secret);
        }
        Ok(TokenParams(params))
    }
}

// =============================================================================
// Endpoints
// =============================================================================

/// Authorization endpoint: validate a request and return consent metadata.
#[tracing::instrument(skip(state, headers, query))]
#[utoipa::path(
    get,
    path = "/authorize",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Authorize",
    summary = "Validate an authorization request",
    description = "Validates the client and redirect URI of an Authorization Code request and returns \
                   what a consent screen needs to render. No code is issued here.\n\n\
                   When the member's portal session is presented as a Bearer token, the response \
                   includes the member; otherwise `user` is null and `login_required` is true.",
    params(
        ("response_type" = String, Query, description = "OAuth2 response type. Must be `code`."),
        ("client_id" = String, Query, description = "The client identifier issued during client registration."),
        ("redirect_uri" = String, Query, description = "Callback URI. Must exactly match a registered redirect URI."),
        ("scope" = Option<String>, Query, description = "Space-separated list of requested scopes (e.g., `profile email`)."),
        ("state" = Option<String>, Query, description = "Opaque value returned unchanged on the callback."),
    ),
    responses(
        (status = 200, description = "Authorization request is valid", body = AuthorizationInfo),
        (status = 400, description = "Invalid request, unknown client or unregistered redirect_uri", body = ErrorResponse),
    )
)]
pub async fn authorize(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Result<Json<AuthorizationInfo>, OAuthError> {
    let Query(params) = query.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    let session = session_user(&state.session_secret, &headers);
    authorize::begin_authorization(&state, &params, session)
        .await
        .map(Json)
}

/// Authorization endpoint: submit the member's consent decision.
#[tracing::instrument(skip(state, headers, body))]
#[utoipa::path(
    post,
    path = "/authorize",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Consent Decision",
    summary = "Approve or deny an authorization request",
    description = "Records the logged-in member's decision. On approval a single-use authorization code \
                   valid for 10 minutes is created and the returned URL carries `code`. On denial the \
                   URL carries `error=access_denied`. Either way `state` is echoed back and the caller \
                   performs the redirect.",
    request_body(content = ConsentRequest, content_type = "application/json"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Callback URL for the client", body = ConsentResponse),
        (status = 400, description = "Invalid request or client", body = ErrorResponse),
        (status = 401, description = "No valid member session", body = ErrorResponse),
    )
)]
pub async fn authorize_decision(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    body: Result<Json<ConsentRequest>, JsonRejection>,
) -> Result<Json<ConsentResponse>, OAuthError> {
    let user = session_user(&state.session_secret, &headers).ok_or(OAuthError::Unauthorized)?;
    let Json(request) = body.map_err(|e| OAuthError::invalid_request(e.body_text()))?;
    let redirect_url = authorize::decide(&state, Some(user), &request).await?;
    Ok(Json(ConsentResponse { redirect_url }))
}

/// Token endpoint.
#[tracing::instrument(skip(state, params))]
#[utoipa::path(
    post,
    path = "/authorize/token",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Exchange an authorization code for an access token",
    description = "Redeems an authorization code exactly once. Only the `authorization_code` grant is \
                   supported.\n\n\
                   **Client authentication:** `client_id` and `client_secret` in the body, or HTTP Basic.\n\n\
                   The body may be JSON or `application/x-www-form-urlencoded`.",
    request_body(
        content = TokenRequest,
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, description = "Missing parameters, unsupported grant type, or invalid/expired/used code", body = ErrorResponse),
        (status = 401, description = "Client authentication failed", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    TokenParams(params): TokenParams,
) -> Result<Json<TokenResponse>, OAuthError> {
    token::exchange(&state, &params).await.map(Json)
}

/// UserInfo endpoint.
#[tracing::instrument(skip(state, headers))]
#[utoipa::path(
    get,
    path = "/authorize/userinfo",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 UserInfo",
    summary = "Get the profile behind an access token",
    description = "Returns the profile claims of the member an access token was issued for. \
                   `name` falls back from display name to full name to email.",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile claims", body = UserInfoResponse),
        (status = 401, description = "Missing, unknown, expired or revoked access token", body = ErrorResponse),
        (status = 404, description = "The member no longer exists", body = ErrorResponse),
    )
)]
pub async fn userinfo(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, OAuthError> {
    userinfo::get_user_info(&state, bearer_token(&headers))
        .await
        .map(Json)
}

/// OAuth 2.0 Authorization Server Metadata (RFC 8414).
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/.well-known/oauth-authorization-server",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Server Metadata",
    summary = "Authorization server metadata",
    responses(
        (status = 200, description = "Server metadata document", body = AuthorizationServerMetadata),
    )
)]
pub async fn authorization_server_metadata(
    State(state): State<OAuth2State>,
) -> Json<AuthorizationServerMetadata> {
    let base = format!("{}{}", state.issuer_url, state.route_prefix);
    Json(AuthorizationServerMetadata {
        issuer: state.issuer_url.clone(),
        authorization_endpoint: format!("{base}/authorize"),
        token_endpoint: format!("{base}/authorize/token"),
        userinfo_endpoint: format!("{base}/authorize/userinfo"),
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![GRANT_TYPE_AUTHORIZATION_CODE.to_string()],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_post".to_string(),
            "client_secret_basic".to_string(),
        ],
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Basic"))
        .map(|(_, credentials)| credentials)?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let creds = String::from_utf8(decoded).ok()?;
    let (id, secret) = creds.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        assert!(basic_credentials(&headers).is_none());

        let encoded = base64::engine::general_purpose::STANDARD.encode("acme:s3cr:et");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("acme".to_string(), "s3cr:et".to_string()))
        );

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("basic {encoded}")).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("acme".to_string(), "s3cr:et".to_string()))
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(basic_credentials(&headers).is_none());
    }
}
