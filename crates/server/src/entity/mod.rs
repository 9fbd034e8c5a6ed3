//! SeaORM entities backing the authorization server.

pub mod oauth2_authorization;
pub mod oauth2_client;
pub mod oauth2_token;
pub mod oauth2_user;
