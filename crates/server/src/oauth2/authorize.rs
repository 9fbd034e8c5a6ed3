//! Authorization Code issuance.
//!
//! Per authorization attempt:
//!
//! ```text
//! REQUESTED -> (client validated) -> AWAITING_CONSENT -> (approve) -> CODE_ISSUED
//!                                                     -> (deny)    -> DENIED
//! ```
//!
//! [`begin_authorization`] covers the first transition and has no side
//! effects. [`decide`] records the member's decision: a denial builds an
//! `access_denied` callback, an approval inserts exactly one fresh code.

use crate::entity::{oauth2_authorization, oauth2_client};
use crate::error::OAuthError;
use crate::oauth2::registrar::{negotiate_scope, verify_redirect_uri};
use crate::oauth2::session::SessionUser;
use crate::oauth2::state::OAuth2State;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Query parameters of `GET /authorize`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthorizeRequest {
    /// Must be "code" for Authorization Code flow
    pub response_type: Option<String>,
    /// Client identifier issued during registration
    pub client_id: Option<String>,
    /// Redirect URI (must exactly match a registered URI)
    pub redirect_uri: Option<String>,
    /// Space-separated list of requested scopes
    pub scope: Option<String>,
    /// Opaque value echoed back on the callback
    pub state: Option<String>,
}

/// Client metadata and normalized request, for the consent UI to render.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationRequestInfo {
    pub client_id: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_description: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Response of `GET /authorize`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizationInfo {
    pub authorization_request: AuthorizationRequestInfo,
    /// The member behind the session, or null when not logged in
    pub user: Option<SessionUser>,
    /// True when no valid session was presented
    pub login_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Approve,
    Deny,
}

/// Body of `POST /authorize`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsentRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub decision: ConsentDecision,
}

/// Response of `POST /authorize`. The caller performs the browser redirect.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsentResponse {
    pub redirect_url: String,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, OAuthError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(format!("{name} is required")))
}

/// Validate client and redirect URI, the shared first step of both handlers.
async fn validated_client(
    state: &OAuth2State,
    client_id: &str,
    redirect_uri: &str,
) -> Result<oauth2_client::Model, OAuthError> {
    let client = state.registry.lookup_active_client(client_id).await?;
    if !verify_redirect_uri(&client, redirect_uri) {
        tracing::info!(client_id, "rejected unregistered redirect_uri");
        return Err(OAuthError::InvalidRedirectUri);
    }
    Ok(client)
}

/// Validate an authorization request and describe it for the consent UI.
#[tracing::instrument(skip(state, params, session), fields(client_id = ?params.client_id))]
pub async fn begin_authorization(
    state: &OAuth2State,
    params: &AuthorizeRequest,
    session: Option<SessionUser>,
) -> Result<AuthorizationInfo, OAuthError> {
    if required(&params.response_type, "response_type")? != "code" {
        return Err(OAuthError::UnsupportedResponseType);
    }
    let client_id = required(&params.client_id, "client_id")?;
    let redirect_uri = required(&params.redirect_uri, "redirect_uri")?;

    let client = validated_client(state, client_id, redirect_uri).await?;
    let scope = negotiate_scope(&client, params.scope.as_deref());

    Ok(AuthorizationInfo {
        authorization_request: AuthorizationRequestInfo {
            client_id: client.id,
            client_name: client.name,
            client_description: client.description,
            redirect_uri: redirect_uri.to_string(),
            scope,
            state: params.state.clone(),
        },
        login_required: session.is_none(),
        user: session,
    })
}

/// Record the member's consent decision and build the client callback URL.
#[tracing::instrument(skip(state, user, request), fields(client_id = ?request.client_id, decision = ?request.decision))]
pub async fn decide(
    state: &OAuth2State,
    user: Option<SessionUser>,
    request: &ConsentRequest,
) -> Result<String, OAuthError> {
    let user = user.ok_or(OAuthError::Unauthorized)?;
    let client_id = required(&request.client_id, "client_id")?;
    let redirect_uri = required(&request.redirect_uri, "redirect_uri")?;

    // Fail closed on anything stale or forged
    let client = match validated_client(state, client_id, redirect_uri).await {
        Ok(c) => c,
        Err(OAuthError::InvalidClient | OAuthError::InvalidRedirectUri) => {
            return Err(OAuthError::InvalidClient);
        }
        Err(e) => return Err(e),
    };
    let client_state = request.state.as_deref().filter(|s| !s.is_empty());

    if request.decision == ConsentDecision::Deny {
        tracing::info!(user_id = %user.id, client_id, "User denied consent");
        return callback_url(redirect_uri, &[("error", "access_denied")], client_state);
    }

    let scope = negotiate_scope(&client, request.scope.as_deref());
    let code = OAuth2State::generate_code()?;
    // No code is stored unless the callback can be delivered
    let redirect_url = callback_url(redirect_uri, &[("code", code.as_str())], client_state)?;
    let now = OffsetDateTime::now_utc();

    oauth2_authorization::ActiveModel {
        code: Set(code.clone()),
        client_id: Set(client.id.clone()),
        user_id: Set(user.id.clone()),
        redirect_uri: Set(redirect_uri.to_string()),
        scope: Set(scope),
        state: Set(client_state.map(String::from)),
        created_at: Set(now),
        expires_at: Set(now + time::Duration::seconds(state.authorization_code_lifetime)),
        used_at: Set(None),
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(user_id = %user.id, client_id, "User granted consent");

    Ok(redirect_url)
}

/// Append callback parameters to a registered redirect URI, keeping any query
/// it already carries.
fn callback_url(
    redirect_uri: &str,
    params: &[(&str, &str)],
    client_state: Option<&str>,
) -> Result<String, OAuthError> {
    let mut url = url::Url::parse(redirect_uri)
        .map_err(|_| OAuthError::invalid_request("redirect_uri is not an absolute URL"))?;
    {
        let mut query = url.query_pairs_mut();
        for (k, v) in params {
            query.append_pair(k, v);
        }
        if let Some(s) = client_state {
            query.append_pair("state", s);
        }
    }
    Ok(url.into())
}
