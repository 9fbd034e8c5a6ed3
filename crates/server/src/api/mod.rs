//! API module assembling the HTTP surface of the authorization server.
//!
//! This module is organized into submodules:
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! The OAuth2 endpoints themselves live in [`crate::oauth2`] and are nested
//! under the configured route prefix.

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::AppResources;
use crate::error::OAuthError;
use crate::oauth2::{self, OAuth2State};
use axum::{Router, http::Method};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// CORS policy: any origin may call `GET`, `POST` and `OPTIONS` with any header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn method_not_allowed() -> OAuthError {
    OAuthError::MethodNotAllowed
}

/// Builds the complete application router.
pub fn app(state: OAuth2State) -> Router {
    let prefix = state.route_prefix.clone();
    let oauth = oauth2::router(state);

    let api = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi());
    let api = if prefix.is_empty() {
        api.merge(oauth)
    } else {
        api.nest(&prefix, oauth)
    };
    let (router, api) = api.routes(routes!(health::health)).split_for_parts();

    router
        .merge(Redoc::with_url("/api-docs", api))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(resources))]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let state = OAuth2State::new(resources.db.clone(), &resources.config);
    let router = app(state);

    let addr = resources.config.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
