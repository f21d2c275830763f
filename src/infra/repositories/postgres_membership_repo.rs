use crate::domain::{
    models::membership::{Membership, MembershipSummary},
    ports::MembershipRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresMembershipRepo {
    pool: PgPool,
}

impl PostgresMembershipRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepo {
    async fn create(&self, membership: &Membership) -> Result<Membership, AppError> {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO memberships (id, user_id, tenant_id, role, permissions, active, accepted_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, tenant_id, role, permissions, active, accepted_at, created_at",
        )
            .bind(membership.id)
            .bind(membership.user_id)
            .bind(membership.tenant_id)
            .bind(membership.role)
            .bind(&membership.permissions)
            .bind(membership.active)
            .bind(membership.accepted_at)
            .bind(membership.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find(&self, user_id: Uuid, tenant_id: Uuid) -> Result<Option<Membership>, AppError> {
        sqlx::query_as::<_, Membership>(
            "SELECT id, user_id, tenant_id, role, permissions, active, accepted_at, created_at \
             FROM memberships WHERE user_id = $1 AND tenant_id = $2",
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<MembershipSummary>, AppError> {
        sqlx::query_as::<_, MembershipSummary>(
            "SELECT t.id AS tenant_id, t.slug AS tenant_slug, t.name AS tenant_name, m.role, m.permissions \
             FROM memberships m JOIN tenants t ON t.id = m.tenant_id \
             WHERE m.user_id = $1 AND m.active AND t.active \
             ORDER BY t.name ASC",
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
