//! OpenAPI/Utoipa configuration.

use crate::api::health::MISC_TAG;
use crate::oauth2::OAUTH2_TAG;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .description(Some(
                "Member session JWT for `/authorize`, access token for `/authorize/userinfo`.",
            ))
            .build();
        components.add_security_scheme("bearer_auth", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Portal OAuth2 API",
        version = "1.0.0",
        description = "OAuth 2.0 Authorization Code flow for third-party access to member portal accounts."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = OAUTH2_TAG, description = "OAuth2 authorization server endpoints")
    )
)]
pub struct ApiDoc;
