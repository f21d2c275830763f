use crate::domain::{
    models::audit::{AuditAction, AuditEvent},
    ports::AuditRepository,
};
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use async_trait::async_trait;

const COLUMNS: &str = "id, tenant_id, principal_id, action, entity_type, entity_id, metadata, ip_address, user_agent, created_at";

/// Insert and read only. The application role holds no UPDATE or DELETE grant on `audit_events`.
pub struct PostgresAuditRepo;

#[async_trait]
impl AuditRepository for PostgresAuditRepo {
    async fn insert(&self, db: &ScopedDb, event: &AuditEvent) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        sqlx::query(&format!(
            "INSERT INTO audit_events ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
            .bind(event.id)
            .bind(tx.require_tenant()?)
            .bind(event.principal_id)
            .bind(event.action)
            .bind(&event.entity_type)
            .bind(&event.entity_id)
            .bind(&event.metadata)
            .bind(&event.ip_address)
            .bind(&event.user_agent)
            .bind(event.created_at)
            .execute(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await
    }

    async fn list_by_entity(&self, db: &ScopedDb, entity_type: &str, entity_id: &str, limit: i64, offset: i64) -> Result<Vec<AuditEvent>, AppError> {
        let mut tx = db.begin().await?;
        let events = sqlx::query_as::<_, AuditEvent>(&format!(
            "SELECT {COLUMNS} FROM audit_events WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
            .bind(entity_type)
            .bind(entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(events)
    }

    async fn list_recent(&self, db: &ScopedDb, limit: i64) -> Result<Vec<AuditEvent>, AppError> {
        let mut tx = db.begin().await?;
        let events = sqlx::query_as::<_, AuditEvent>(&format!(
            "SELECT {COLUMNS} FROM audit_events ORDER BY created_at DESC LIMIT $1"
        ))
            .bind(limit)
            .fetch_all(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(events)
    }

    async fn list_by_action(&self, db: &ScopedDb, action: AuditAction, limit: i64) -> Result<Vec<AuditEvent>, AppError> {
        let mut tx = db.begin().await?;
        let events = sqlx::query_as::<_, AuditEvent>(&format!(
            "SELECT {COLUMNS} FROM audit_events WHERE action = $1 ORDER BY created_at DESC LIMIT $2"
        ))
            .bind(action)
            .bind(limit)
            .fetch_all(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(events)
    }
}
