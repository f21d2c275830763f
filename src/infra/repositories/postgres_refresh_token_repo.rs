use crate::domain::{models::auth::RefreshTokenRecord, ports::RefreshTokenRepository};
use crate::error::AppError;
use crate::infra::gateway::{ScopedDb, ScopedTx};
use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

/// Which credential space a repository instance serves.
#[derive(Debug, Clone, Copy)]
pub enum RefreshTokenTable {
    /// `refresh_tokens`, global.
    Employee,
    /// `client_refresh_tokens`, row-security scoped.
    Portal,
}

impl RefreshTokenTable {
    fn select_by_hash(self) -> &'static str {
        match self {
            RefreshTokenTable::Employee => {
                "SELECT token_hash, user_id AS principal_id, NULL::uuid AS tenant_id, expires_at, created_at \
                 FROM refresh_tokens WHERE token_hash = $1"
            }
            RefreshTokenTable::Portal => {
                "SELECT token_hash, client_user_id AS principal_id, tenant_id, expires_at, created_at \
                 FROM client_refresh_tokens WHERE token_hash = $1"
            }
        }
    }

    fn delete_by_hash(self) -> &'static str {
        match self {
            RefreshTokenTable::Employee => "DELETE FROM refresh_tokens WHERE token_hash = $1",
            RefreshTokenTable::Portal => "DELETE FROM client_refresh_tokens WHERE token_hash = $1",
        }
    }

    fn delete_by_principal(self) -> &'static str {
        match self {
            RefreshTokenTable::Employee => "DELETE FROM refresh_tokens WHERE user_id = $1",
            RefreshTokenTable::Portal => "DELETE FROM client_refresh_tokens WHERE client_user_id = $1",
        }
    }

    fn delete_expired(self) -> &'static str {
        match self {
            RefreshTokenTable::Employee => "DELETE FROM refresh_tokens WHERE expires_at <= now()",
            RefreshTokenTable::Portal => "DELETE FROM client_refresh_tokens WHERE expires_at <= now()",
        }
    }

    async fn insert(self, tx: &mut ScopedTx, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let query = match self {
            RefreshTokenTable::Employee => sqlx::query(
                "INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
            )
                .bind(&record.token_hash)
                .bind(record.principal_id)
                .bind(record.expires_at)
                .bind(record.created_at),
            RefreshTokenTable::Portal => sqlx::query(
                "INSERT INTO client_refresh_tokens (token_hash, client_user_id, tenant_id, expires_at, created_at) VALUES ($1, $2, $3, $4, $5)",
            )
                .bind(&record.token_hash)
                .bind(record.principal_id)
                .bind(tx.require_tenant()?)
                .bind(record.expires_at)
                .bind(record.created_at),
        };

        query.execute(tx.conn()).await.map_err(|e| {
            error!("Postgres Refresh Token Insert Failed: {:?}", e);
            AppError::Database(e)
        })?;
        Ok(())
    }
}

pub struct PostgresRefreshTokenRepo {
    table: RefreshTokenTable,
}

impl PostgresRefreshTokenRepo {
    pub fn new(table: RefreshTokenTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepo {
    async fn create(&self, db: &ScopedDb, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        self.table.insert(&mut tx, record).await?;
        tx.commit().await
    }

    async fn find(&self, db: &ScopedDb, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let mut tx = db.begin().await?;
        let record = sqlx::query_as::<_, RefreshTokenRecord>(self.table.select_by_hash())
            .bind(token_hash)
            .fetch_optional(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(record)
    }

    async fn rotate(&self, db: &ScopedDb, old_hash: &str, replacement: &RefreshTokenRecord) -> Result<bool, AppError> {
        let table = self.table;
        let old_hash = old_hash.to_string();
        let replacement = replacement.clone();

        db.transaction(move |tx| Box::pin(async move {
            let deleted = sqlx::query(table.delete_by_hash())
                .bind(&old_hash)
                .execute(tx.conn())
                .await?
                .rows_affected();

            if deleted == 0 {
                return Ok(false);
            }
            table.insert(tx, &replacement).await?;
            Ok(true)
        }))
        .await
    }

    async fn delete(&self, db: &ScopedDb, token_hash: &str) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        sqlx::query(self.table.delete_by_hash())
            .bind(token_hash)
            .execute(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await
    }

    async fn delete_all_for_principal(&self, db: &ScopedDb, principal_id: Uuid) -> Result<u64, AppError> {
        let mut tx = db.begin().await?;
        let deleted = sqlx::query(self.table.delete_by_principal())
            .bind(principal_id)
            .execute(tx.conn())
            .await
            .map_err(AppError::Database)?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }

    async fn delete_expired(&self, db: &ScopedDb) -> Result<u64, AppError> {
        let mut tx = db.begin().await?;
        let deleted = sqlx::query(self.table.delete_expired())
            .execute(tx.conn())
            .await
            .map_err(AppError::Database)?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }
}
