use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Settings of the authorization code flow.
#[derive(Clone, Debug, Deserialize)]
pub struct OAuth2Config {
    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: i64,
    /// Authorization code lifetime in seconds
    #[serde(default = "default_authorization_code_lifetime")]
    pub authorization_code_lifetime: i64,
    /// Prefix marking values issued as access tokens (e.g. `oat_`)
    #[serde(default = "default_access_token_prefix")]
    pub access_token_prefix: String,
    /// Path the OAuth routes are nested under
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            access_token_lifetime: default_access_token_lifetime(),
            authorization_code_lifetime: default_authorization_code_lifetime(),
            access_token_prefix: default_access_token_prefix(),
            route_prefix: default_route_prefix(),
        }
    }
}

fn default_access_token_lifetime() -> i64 {
    86400 // 24 hours
}

fn default_authorization_code_lifetime() -> i64 {
    600 // 10 minutes
}

fn default_access_token_prefix() -> String {
    "oat_".into()
}

fn default_route_prefix() -> String {
    "/oauth".into()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Public base URL of this server, used in discovery metadata
    pub issuer_url: String,
    /// HS256 secret the portal signs member session tokens with
    pub session_secret: String,
    #[serde(default)]
    pub oauth2: OAuth2Config,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"<redacted>")
            .field("listen_addr", &self.listen_addr)
            .field("issuer_url", &self.issuer_url)
            .field("session_secret", &"<redacted>")
            .field("oauth2", &self.oauth2)
            .finish()
    }
}

impl AppConfig {
    /// Check invariants the deserializer cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < 32 {
            return Err(ConfigError::Validation(
                "session_secret must be at least 32 characters".into(),
            ));
        }
        if self.oauth2.access_token_lifetime <= 0 {
            return Err(ConfigError::Validation(
                "oauth2.access_token_lifetime must be > 0".into(),
            ));
        }
        if self.oauth2.authorization_code_lifetime <= 0 {
            return Err(ConfigError::Validation(
                "oauth2.authorization_code_lifetime must be > 0".into(),
            ));
        }
        if !self
            .oauth2
            .access_token_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Validation(
                "oauth2.access_token_prefix may only contain ASCII letters, digits and '_'".into(),
            ));
        }
        if !self.oauth2.route_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "oauth2.route_prefix must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// A `.env` file, when present, is loaded into the process environment first.
/// Any variable matching the key path separated by double underscores
/// (e.g. `OAUTH2__ACCESS_TOKEN_LIFETIME`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!(error = %e, "failed to read .env file");
    }

    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
