use portal_oauth_server::AppResources;
use portal_oauth_server::api::start_webserver;
use portal_oauth_server::config::load_config_or_panic;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "portal_oauth_server=info,sea_orm=info,tower_http=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    let config = Arc::new(load_config_or_panic());

    // Every store call is bounded; a slow database surfaces as server_error
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let db = Arc::new(Database::connect(options).await?);

    tracing::info!(
        issuer = %config.issuer_url,
        route_prefix = %config.oauth2.route_prefix,
        access_token_lifetime = config.oauth2.access_token_lifetime,
        "starting OAuth2 authorization server"
    );

    start_webserver(AppResources { db, config }).await
}
