//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use base64::Engine;
use portal_oauth_server::{
    config::{AppConfig, OAuth2Config},
    entity::oauth2_user,
    oauth2::{
        ClientRegistry, NewClient, OAuth2State,
        authorize::{self, ConsentDecision, ConsentRequest},
        issue_session_token,
        session::SessionUser,
    },
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, DbBackend, Statement,
};
use std::sync::Arc;
use time::OffsetDateTime;

pub const SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";
pub const CLIENT_ID: &str = "acme";
pub const REDIRECT_URI: &str = "https://acme.example/cb";
pub const USER_ID: &str = "user-1";
pub const USER_EMAIL: &str = "member@example.com";

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub state: OAuth2State,
    pub client_secret: String,
}

/// In-memory SQLite database with the authorization server tables.
///
/// The pool is capped at one connection so every query sees the same
/// in-memory database.
pub async fn create_test_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect");

    for ddl in [
        r#"CREATE TABLE oauth2_client (
            id TEXT PRIMARY KEY,
            secret_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NULL,
            redirect_uris TEXT NOT NULL,
            scopes TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE oauth2_user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            email_verified INTEGER NOT NULL DEFAULT 0,
            display_name TEXT NULL,
            full_name TEXT NULL,
            avatar_url TEXT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE oauth2_authorization (
            code TEXT PRIMARY KEY,
            client_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            redirect_uri TEXT NOT NULL,
            scope TEXT NOT NULL,
            state TEXT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            used_at TEXT NULL
        );"#,
        r#"CREATE TABLE oauth2_token (
            id TEXT PRIMARY KEY,
            token_hash TEXT NOT NULL UNIQUE,
            client_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            scope TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            revoked_at TEXT NULL
        );"#,
    ] {
        db.execute(Statement::from_string(DbBackend::Sqlite, ddl))
            .await
            .expect("create table");
    }

    Arc::new(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        issuer_url: "https://auth.example".into(),
        session_secret: SESSION_SECRET.into(),
        oauth2: OAuth2Config::default(),
    }
}

pub async fn insert_user(
    db: &DatabaseConnection,
    id: &str,
    email: &str,
    display_name: Option<&str>,
    full_name: Option<&str>,
) -> oauth2_user::Model {
    let now = OffsetDateTime::now_utc();
    oauth2_user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        email_verified: Set(true),
        display_name: Set(display_name.map(String::from)),
        full_name: Set(full_name.map(String::from)),
        avatar_url: Set(Some("https://cdn.example/avatar.png".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// Database with one active client (`acme`) and one member (`user-1`).
pub async fn setup() -> TestContext {
    let db = create_test_db().await;
    let state = OAuth2State::new(db.clone(), &test_config());

    let (_, client_secret) = ClientRegistry::new(db.clone())
        .register_client(NewClient {
            id: CLIENT_ID.into(),
            name: "Acme Reports".into(),
            description: Some("Monthly reporting for members".into()),
            redirect_uris: vec![REDIRECT_URI.into()],
            scopes: vec!["profile".into(), "email".into()],
        })
        .await
        .expect("register client");

    insert_user(&db, USER_ID, USER_EMAIL, Some("Sam"), Some("Sam Example")).await;

    TestContext {
        db,
        state,
        client_secret,
    }
}

pub fn session_token(user_id: &str, email: &str) -> String {
    issue_session_token(SESSION_SECRET, user_id, email, time::Duration::hours(1))
        .expect("sign session")
}

pub fn session_user() -> SessionUser {
    SessionUser {
        id: USER_ID.into(),
        email: USER_EMAIL.into(),
    }
}

pub fn basic_auth(client_id: &str, secret: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{client_id}:{secret}"));
    format!("Basic {encoded}")
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .expect("absolute url")
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Approve a consent request for `user-1` and return the issued code.
pub async fn issue_code(ctx: &TestContext) -> String {
    let url = authorize::decide(
        &ctx.state,
        Some(session_user()),
        &ConsentRequest {
            client_id: Some(CLIENT_ID.into()),
            redirect_uri: Some(REDIRECT_URI.into()),
            scope: Some("profile email".into()),
            state: Some("xyz".into()),
            decision: ConsentDecision::Approve,
        },
    )
    .await
    .expect("approve consent");
    query_param(&url, "code").expect("code in callback")
}
