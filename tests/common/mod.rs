#![allow(dead_code)]

use bridal_api::{
    config::{AppConfig, PaymentConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::RegisterRequest,
    middleware::auth::AuthUser,
    models::Role,
    services::auth_service,
    state::AppState,
};
use sea_orm::{ConnectionTrait, SqlxPostgresConnector, Statement};
use sqlx::postgres::PgPoolOptions;

/// Database URL for integration flows, or `None` to skip them.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    setup_state_with(database_url, |_| {}).await
}

/// Like `setup_state`, with a hook to adjust the config first.
pub async fn setup_state_with(
    database_url: &str,
    tweak: impl FnOnce(&mut AppConfig),
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE reviews, appointments, payments, order_items, orders, cart_items, carts, dresses, collections, designers, audit_logs, revoked_tokens, users CASCADE",
    ))
    .await?;

    let pool = create_pool(database_url).await?;
    let mut config = test_config(database_url);
    tweak(&mut config);
    AppState::new(pool, orm, config)
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        access_token_ttl_minutes: 5,
        refresh_token_ttl_days: 1,
        banned_ips: Vec::new(),
        rate_limit_per_minute: 60,
        cache_ttl_secs: 60,
        cache_max_entries: 100,
        payment: PaymentConfig {
            gateway_url: "http://127.0.0.1:9".into(),
            secret_key: None,
            callback_url: None,
            currency: "ETB".into(),
        },
    }
}

/// State whose pools never connect, for requests rejected before any query.
pub fn offline_state(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(&config.database_url)?;
    let orm = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
    AppState::new(pool, orm, config)
}

/// Registers an account through the auth service and returns it as a caller.
pub async fn register(state: &AppState, username: &str, role: Role) -> anyhow::Result<AuthUser> {
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "password123".into(),
            role: Some(role),
            phone: None,
            address: None,
        },
    )
    .await?
    .data
    .expect("registered user");
    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

/// Admins cannot self-register, so they are promoted directly.
pub async fn register_admin(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    let user = register(state, username, Role::Customer).await?;
    state
        .orm
        .execute(Statement::from_sql_and_values(
            state.orm.get_database_backend(),
            "UPDATE users SET role = 'admin' WHERE id = $1",
            [user.user_id.into()],
        ))
        .await?;
    Ok(AuthUser {
        user_id: user.user_id,
        role: Role::Admin,
    })
}
