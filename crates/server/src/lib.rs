//! OAuth 2.0 authorization server for the member portal.
//!
//! Lets registered third-party clients obtain a member's consent through the
//! Authorization Code flow, redeem the code for a bearer token, and resolve
//! that token to the member's profile.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod oauth2;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}
