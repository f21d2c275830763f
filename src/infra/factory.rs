use std::sync::Arc;
use std::time::Duration;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use tracing::{error, info, warn};
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::infra::gateway::TenantGateway;
use crate::infra::repositories::{
    postgres_audit_repo::PostgresAuditRepo,
    postgres_client_user_repo::PostgresClientUserRepo,
    postgres_membership_repo::PostgresMembershipRepo,
    postgres_order_repo::PostgresOrderRepo,
    postgres_refresh_token_repo::{PostgresRefreshTokenRepo, RefreshTokenTable},
    postgres_tenant_repo::PostgresTenantRepo,
    postgres_user_repo::PostgresUserRepo,
};
use crate::state::{AppState, Repositories};

pub async fn connect_pool(config: &Config) -> Result<PgPool, AppError> {
    info!("Initializing PostgreSQL connection...");

    let opts: PgConnectOptions = config.database_url.parse().map_err(AppError::Database)?;
    let opts = opts
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(opts)
        .await
        .map_err(AppError::Database)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("migrations failed: {}", e)))
}

/// Row-security policies do not apply to superusers or `BYPASSRLS` roles.
/// Such a connection is only acceptable when scoped transactions switch to
/// the application role.
pub async fn ensure_row_security(pool: &PgPool, app_role: Option<&str>) -> Result<(), AppError> {
    let bypasses: bool = sqlx::query_scalar(
        "SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = current_user",
    )
    .fetch_one(pool)
    .await?;

    match (bypasses, app_role) {
        (true, None) => {
            error!("Connecting role bypasses row-level security and DATABASE_APP_ROLE is disabled");
            Err(AppError::InternalWithMsg(
                "connecting role bypasses row-level security; set DATABASE_APP_ROLE".into(),
            ))
        }
        (true, Some(role)) => {
            warn!("Connecting role bypasses row-level security; scoped transactions switch to {}", role);
            Ok(())
        }
        (false, _) => Ok(()),
    }
}

pub fn postgres_repositories(pool: &PgPool) -> Repositories {
    Repositories {
        tenants: Arc::new(PostgresTenantRepo::new(pool.clone())),
        users: Arc::new(PostgresUserRepo::new(pool.clone())),
        memberships: Arc::new(PostgresMembershipRepo::new(pool.clone())),
        client_users: Arc::new(PostgresClientUserRepo),
        employee_refresh_tokens: Arc::new(PostgresRefreshTokenRepo::new(RefreshTokenTable::Employee)),
        portal_refresh_tokens: Arc::new(PostgresRefreshTokenRepo::new(RefreshTokenTable::Portal)),
        orders: Arc::new(PostgresOrderRepo),
        audit: Arc::new(PostgresAuditRepo),
    }
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let pool = connect_pool(config).await?;
    run_migrations(&pool).await?;

    ensure_row_security(&pool, config.db_app_role.as_deref()).await?;
    if let Some(role) = &config.db_app_role {
        info!("Scoped transactions will run as role {}", role);
    }

    let gateway = TenantGateway::new(pool.clone(), config.db_statement_timeout, config.db_app_role.clone());
    Ok(AppState::assemble(config.clone(), gateway, postgres_repositories(&pool)))
}
