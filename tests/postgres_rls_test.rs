//! Row-level security against a real PostgreSQL. Skipped unless
//! `TEST_DATABASE_URL` points at a database the tests may migrate.

use dockpulse_backend::domain::models::auth::RefreshTokenRecord;
use dockpulse_backend::domain::models::client_user::ClientUser;
use dockpulse_backend::domain::models::order::{Order, OrderStatus};
use dockpulse_backend::domain::models::tenant::Tenant;
use dockpulse_backend::domain::models::user::User;
use dockpulse_backend::domain::ports::{
    ClientUserRepository, OrderRepository, RefreshTokenRepository, TenantRepository, UserRepository,
};
use dockpulse_backend::domain::services::token_service::hash_token;
use dockpulse_backend::config::Config;
use dockpulse_backend::error::AppError;
use dockpulse_backend::infra::factory::{ensure_row_security, run_migrations};
use dockpulse_backend::infra::gateway::TenantGateway;
use dockpulse_backend::infra::repositories::{
    postgres_client_user_repo::PostgresClientUserRepo,
    postgres_order_repo::PostgresOrderRepo,
    postgres_refresh_token_repo::{PostgresRefreshTokenRepo, RefreshTokenTable},
    postgres_tenant_repo::PostgresTenantRepo,
    postgres_user_repo::PostgresUserRepo,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

const APP_ROLE: &str = "dockpulse_app";

async fn setup(max_connections: u32) -> Option<(PgPool, TenantGateway)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let gateway = TenantGateway::new(pool.clone(), Duration::from_secs(5), Some(APP_ROLE.to_string()));
    Some((pool, gateway))
}

async fn tenant(pool: &PgPool) -> Tenant {
    let slug = format!("rls-{}", &Uuid::new_v4().simple().to_string()[..12]);
    PostgresTenantRepo::new(pool.clone())
        .create(&Tenant::new(slug, "RLS test".into(), "starter".into()))
        .await
        .unwrap()
}

async fn employee(pool: &PgPool) -> User {
    let phone = format!("7{:08}", Uuid::new_v4().as_u128() % 100_000_000);
    PostgresUserRepo::new(pool.clone()).create(&User::new(phone, "x".into(), None)).await.unwrap()
}

async fn order(gateway: &TenantGateway, tenant: &Tenant, number: &str) -> Order {
    PostgresOrderRepo
        .create(&gateway.scoped(tenant.id), &Order::new(tenant.id, number.into(), "Odbiorca".into(), 1_000))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_scoped_reads_and_writes_stay_in_tenant() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let beta = tenant(&pool).await;
    let acme_order = order(&gateway, &acme, "A-1").await;
    let beta_order = order(&gateway, &beta, "B-1").await;

    let acme_db = gateway.scoped(acme.id);
    let listed = PostgresOrderRepo.list(&acme_db).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, acme_order.id);
    assert_eq!(PostgresOrderRepo.count(&acme_db).await.unwrap(), 1);

    assert!(PostgresOrderRepo.find_by_id(&acme_db, beta_order.id).await.unwrap().is_none());
    assert!(PostgresOrderRepo.update_status(&acme_db, beta_order.id, OrderStatus::Cancelled, Uuid::new_v4()).await.unwrap().is_none());
    assert!(!PostgresOrderRepo.delete(&acme_db, beta_order.id).await.unwrap());

    let beta_db = gateway.scoped(beta.id);
    let untouched = PostgresOrderRepo.find_by_id(&beta_db, beta_order.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, OrderStatus::New);
}

#[tokio::test]
async fn test_unscoped_handle_sees_nothing_and_cannot_insert() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    order(&gateway, &acme, "A-2").await;

    let unscoped = gateway.unscoped();
    assert!(PostgresOrderRepo.list(&unscoped).await.unwrap().is_empty());
    assert_eq!(PostgresOrderRepo.count(&unscoped).await.unwrap(), 0);

    let result = PostgresOrderRepo
        .create(&unscoped, &Order::new(acme.id, "A-3".into(), "Odbiorca".into(), 0))
        .await;
    assert!(matches!(result, Err(AppError::MissingTenantIdentifier)));
}

#[tokio::test]
async fn test_policy_rejects_rows_for_another_tenant() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let beta = tenant(&pool).await;

    let mut tx = gateway.scoped(acme.id).begin().await.unwrap();
    let err = sqlx::query("INSERT INTO orders (id, tenant_id, number, customer_name) VALUES ($1, $2, 'X-1', 'Obcy')")
        .bind(Uuid::new_v4())
        .bind(beta.id)
        .execute(tx.conn())
        .await
        .unwrap_err();
    tx.rollback().await;

    let code = err.as_database_error().and_then(|e| e.code()).map(|c| c.into_owned());
    assert_eq!(code.as_deref(), Some("42501"));
    assert_eq!(AppError::Database(err).code(), "POLICY_VIOLATION");
}

#[tokio::test]
async fn test_tenant_setting_does_not_outlive_transaction() {
    let Some((pool, gateway)) = setup(1).await else { return };
    let acme = tenant(&pool).await;
    order(&gateway, &acme, "A-4").await;

    // Single connection: the next checkout reuses the one just pinned
    let setting: Option<String> = sqlx::query_scalar("SELECT current_setting('app.current_tenant', true)")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(setting.unwrap_or_default().is_empty());

    let role: String = sqlx::query_scalar("SELECT current_user::text").fetch_one(&pool).await.unwrap();
    assert_ne!(role, APP_ROLE);
}

#[tokio::test]
async fn test_status_update_writes_history_in_same_transaction() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let created = order(&gateway, &acme, "A-5").await;
    let db = gateway.scoped(acme.id);
    let actor = employee(&pool).await;

    let updated = PostgresOrderRepo.update_status(&db, created.id, OrderStatus::InProgress, actor.id).await.unwrap().unwrap();
    assert_eq!(updated.status, OrderStatus::InProgress);

    let mut tx = db.begin().await.unwrap();
    let history: i64 = sqlx::query_scalar("SELECT count(*) FROM order_status_history WHERE order_id = $1")
        .bind(created.id)
        .fetch_one(tx.conn())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(history, 1);

    // History is invisible from any other tenant
    let beta = tenant(&pool).await;
    let mut tx = gateway.scoped(beta.id).begin().await.unwrap();
    let leaked: i64 = sqlx::query_scalar("SELECT count(*) FROM order_status_history WHERE order_id = $1")
        .bind(created.id)
        .fetch_one(tx.conn())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(leaked, 0);
}

#[tokio::test]
async fn test_portal_refresh_tokens_are_tenant_scoped() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let beta = tenant(&pool).await;
    let acme_db = gateway.scoped(acme.id);

    let client = PostgresClientUserRepo
        .create(&acme_db, &ClientUser::new(acme.id, "rls@acme.pl".into(), "x".into(), "Klient".into()))
        .await
        .unwrap();
    assert!(PostgresClientUserRepo.find_by_email(&gateway.scoped(beta.id), "RLS@acme.pl").await.unwrap().is_none());
    assert!(PostgresClientUserRepo.find_by_email(&acme_db, "RLS@acme.pl").await.unwrap().is_some());

    let repo = PostgresRefreshTokenRepo::new(RefreshTokenTable::Portal);
    let now = chrono::Utc::now();
    let record = RefreshTokenRecord {
        token_hash: hash_token(&Uuid::new_v4().to_string()),
        principal_id: client.id,
        tenant_id: Some(acme.id),
        expires_at: now + chrono::Duration::days(7),
        created_at: now,
    };
    repo.create(&acme_db, &record).await.unwrap();

    let beta_db = gateway.scoped(beta.id);
    assert!(repo.find(&beta_db, &record.token_hash).await.unwrap().is_none());
    assert_eq!(repo.delete_all_for_principal(&beta_db, client.id).await.unwrap(), 0);

    let replacement = RefreshTokenRecord { token_hash: hash_token("next"), ..record.clone() };
    assert!(!repo.rotate(&beta_db, &record.token_hash, &replacement).await.unwrap());
    assert!(repo.rotate(&acme_db, &record.token_hash, &replacement).await.unwrap());
    assert!(!repo.rotate(&acme_db, &record.token_hash, &replacement).await.unwrap());

    let found = repo.find(&acme_db, &replacement.token_hash).await.unwrap().unwrap();
    assert_eq!(found.tenant_id, Some(acme.id));
    assert_eq!(repo.delete_all_for_principal(&acme_db, client.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_employee_tokens_purge_expired() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let user = employee(&pool).await;

    let repo = PostgresRefreshTokenRepo::new(RefreshTokenTable::Employee);
    let db = gateway.unscoped();
    let now = chrono::Utc::now();
    let expired = RefreshTokenRecord {
        token_hash: hash_token(&Uuid::new_v4().to_string()),
        principal_id: user.id,
        tenant_id: None,
        expires_at: now - chrono::Duration::minutes(1),
        created_at: now - chrono::Duration::days(8),
    };
    repo.create(&db, &expired).await.unwrap();

    assert!(repo.delete_expired(&db).await.unwrap() >= 1);
    assert!(repo.find(&db, &expired.token_hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_default_config_isolates_even_for_privileged_connections() {
    let Some((pool, _)) = setup(5).await else { return };
    let config = Config::new(String::new(), "x".repeat(32));
    assert_eq!(config.db_app_role.as_deref(), Some(APP_ROLE));
    let gateway = TenantGateway::new(pool.clone(), config.db_statement_timeout, config.db_app_role.clone());

    let acme = tenant(&pool).await;
    let beta = tenant(&pool).await;
    let acme_order = order(&gateway, &acme, "A-6").await;
    order(&gateway, &beta, "B-6").await;

    let listed = PostgresOrderRepo.list(&gateway.scoped(acme.id)).await.unwrap();
    assert_eq!(listed.iter().map(|o| o.id).collect::<Vec<_>>(), vec![acme_order.id]);

    let app_role_bypasses: bool = sqlx::query_scalar("SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = $1")
        .bind(APP_ROLE)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!app_role_bypasses);
}

#[tokio::test]
async fn test_startup_refuses_bypassing_role_without_app_role() {
    let Some((pool, _)) = setup(1).await else { return };
    let bypasses: bool = sqlx::query_scalar("SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = current_user")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert!(ensure_row_security(&pool, Some(APP_ROLE)).await.is_ok());
    assert_eq!(ensure_row_security(&pool, None).await.is_err(), bypasses);
}

#[tokio::test]
async fn test_failed_pin_aborts_transaction() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let broken = TenantGateway::new(pool.clone(), Duration::from_secs(5), Some("no_such_role".into()));
    let broken_db = broken.scoped(acme.id);

    assert!(broken_db.begin().await.is_err());

    let result = broken_db
        .transaction(move |tx| Box::pin(async move {
            sqlx::query("INSERT INTO orders (id, tenant_id, number, customer_name) VALUES ($1, $2, 'A-7', 'Odbiorca')")
                .bind(Uuid::new_v4())
                .bind(tx.require_tenant()?)
                .execute(tx.conn())
                .await?;
            Ok(())
        }))
        .await;
    assert!(matches!(result, Err(AppError::Database(_))));

    let created = PostgresOrderRepo
        .create(&broken_db, &Order::new(acme.id, "A-8".into(), "Odbiorca".into(), 0))
        .await;
    assert!(created.is_err());

    assert_eq!(PostgresOrderRepo.count(&gateway.scoped(acme.id)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_multi_statement_transaction_stays_in_tenant() {
    let Some((pool, gateway)) = setup(5).await else { return };
    let acme = tenant(&pool).await;
    let beta = tenant(&pool).await;
    order(&gateway, &acme, "A-9").await;
    let beta_order = order(&gateway, &beta, "B-9").await;
    let target = beta_order.id;

    let (seen, total, deleted) = gateway
        .scoped(acme.id)
        .transaction(move |tx| Box::pin(async move {
            let seen: i64 = sqlx::query_scalar("SELECT count(*) FROM orders WHERE id = $1")
                .bind(target)
                .fetch_one(tx.conn())
                .await?;
            let total: i64 = sqlx::query_scalar("SELECT count(*) FROM orders")
                .fetch_one(tx.conn())
                .await?;
            let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
                .bind(target)
                .execute(tx.conn())
                .await?
                .rows_affected();
            Ok((seen, total, deleted))
        }))
        .await
        .unwrap();

    assert_eq!(seen, 0);
    assert_eq!(total, 1);
    assert_eq!(deleted, 0);
    assert!(PostgresOrderRepo.find_by_id(&gateway.scoped(beta.id), beta_order.id).await.unwrap().is_some());
}
