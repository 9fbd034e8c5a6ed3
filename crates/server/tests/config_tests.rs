use config::Config;
use portal_oauth_server::config::{AppConfig, OAuth2Config};

fn from_yaml(yaml: &str) -> AppConfig {
    Config::builder()
        .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
        .build()
        .expect("Failed to build config")
        .try_deserialize()
        .expect("Failed to deserialize app config")
}

#[test]
fn test_app_config_deserialization() {
    let app_config = from_yaml(
        r#"
database_url: "postgres://localhost/portal"
listen_addr: "127.0.0.1:9000"
issuer_url: "https://auth.example.com/"
session_secret: "0123456789abcdef0123456789abcdef"
oauth2:
  access_token_lifetime: 3600
  authorization_code_lifetime: 300
  access_token_prefix: "pat_"
  route_prefix: "/auth"
"#,
    );

    assert_eq!(app_config.database_url, "postgres://localhost/portal");
    assert_eq!(app_config.listen_addr, "127.0.0.1:9000");
    assert_eq!(app_config.issuer_url, "https://auth.example.com/");
    assert_eq!(app_config.oauth2.access_token_lifetime, 3600);
    assert_eq!(app_config.oauth2.authorization_code_lifetime, 300);
    assert_eq!(app_config.oauth2.access_token_prefix, "pat_");
    assert_eq!(app_config.oauth2.route_prefix, "/auth");
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_oauth2_section_defaults() {
    let app_config = from_yaml(
        r#"
database_url: "sqlite::memory:"
issuer_url: "http://localhost:8080"
session_secret: "0123456789abcdef0123456789abcdef"
"#,
    );

    assert_eq!(app_config.listen_addr, "0.0.0.0:8080");
    let defaults = OAuth2Config::default();
    assert_eq!(app_config.oauth2.access_token_lifetime, 86400);
    assert_eq!(
        app_config.oauth2.access_token_lifetime,
        defaults.access_token_lifetime
    );
    assert_eq!(app_config.oauth2.authorization_code_lifetime, 600);
    assert_eq!(app_config.oauth2.access_token_prefix, "oat_");
    assert_eq!(app_config.oauth2.route_prefix, "/oauth");
}

#[test]
fn test_partial_oauth2_section() {
    let app_config = from_yaml(
        r#"
database_url: "sqlite::memory:"
issuer_url: "http://localhost:8080"
session_secret: "0123456789abcdef0123456789abcdef"
oauth2:
  access_token_lifetime: 120
"#,
    );

    assert_eq!(app_config.oauth2.access_token_lifetime, 120);
    assert_eq!(app_config.oauth2.authorization_code_lifetime, 600);
    assert_eq!(app_config.oauth2.access_token_prefix, "oat_");
}

#[test]
fn test_missing_required_field_fails() {
    let result = Config::builder()
        .add_source(config::File::from_str(
            r#"
database_url: "sqlite::memory:"
issuer_url: "http://localhost:8080"
"#,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config")
        .try_deserialize::<AppConfig>();

    assert!(result.is_err());
}

#[test]
fn test_short_session_secret_fails_validation() {
    let app_config = from_yaml(
        r#"
database_url: "sqlite::memory:"
issuer_url: "http://localhost:8080"
session_secret: "too-short"
"#,
    );

    assert!(app_config.validate().is_err());
}
