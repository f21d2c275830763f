use crate::domain::{models::client_user::ClientUser, ports::ClientUserRepository};
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use async_trait::async_trait;
use uuid::Uuid;

const COLUMNS: &str = "id, tenant_id, email, password_hash, name, active, created_at";

/// Row-security scoped. No statement here names a tenant in its predicate.
pub struct PostgresClientUserRepo;

#[async_trait]
impl ClientUserRepository for PostgresClientUserRepo {
    async fn create(&self, db: &ScopedDb, client: &ClientUser) -> Result<ClientUser, AppError> {
        let mut tx = db.begin().await?;
        let created = sqlx::query_as::<_, ClientUser>(&format!(
            "INSERT INTO client_users ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
            .bind(client.id)
            .bind(tx.require_tenant()?)
            .bind(&client.email)
            .bind(&client.password_hash)
            .bind(&client.name)
            .bind(client.active)
            .bind(client.created_at)
            .fetch_one(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_email(&self, db: &ScopedDb, email: &str) -> Result<Option<ClientUser>, AppError> {
        let mut tx = db.begin().await?;
        let client = sqlx::query_as::<_, ClientUser>(&format!(
            "SELECT {COLUMNS} FROM client_users WHERE lower(email) = lower($1)"
        ))
            .bind(email)
            .fetch_optional(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(client)
    }

    async fn find_by_id(&self, db: &ScopedDb, id: Uuid) -> Result<Option<ClientUser>, AppError> {
        let mut tx = db.begin().await?;
        let client = sqlx::query_as::<_, ClientUser>(&format!("SELECT {COLUMNS} FROM client_users WHERE id = $1"))
            .bind(id)
            .fetch_optional(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(client)
    }

    async fn update_password(&self, db: &ScopedDb, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        sqlx::query("UPDATE client_users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await
    }
}
