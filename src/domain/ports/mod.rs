//! Persistence ports.
//!
//! Global tables (tenants, users, memberships) are reached directly.
//! Everything tenant-scoped takes a `ScopedDb`, so the tenant travels with
//! the call instead of living in shared state.

use crate::domain::models::{
    audit::{AuditAction, AuditEvent},
    auth::{Principal, RefreshTokenRecord},
    client_user::ClientUser,
    membership::{Membership, MembershipSummary},
    order::{Order, OrderStatus},
    tenant::Tenant,
    user::User,
};
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Tenant>, AppError>;
    /// Every tenant, disabled ones included.
    async fn list_ids(&self) -> Result<Vec<Uuid>, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create(&self, membership: &Membership) -> Result<Membership, AppError>;
    async fn find(&self, user_id: Uuid, tenant_id: Uuid) -> Result<Option<Membership>, AppError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<MembershipSummary>, AppError>;
}

#[async_trait]
pub trait ClientUserRepository: Send + Sync {
    async fn create(&self, db: &ScopedDb, client: &ClientUser) -> Result<ClientUser, AppError>;
    async fn find_by_email(&self, db: &ScopedDb, email: &str) -> Result<Option<ClientUser>, AppError>;
    async fn find_by_id(&self, db: &ScopedDb, id: Uuid) -> Result<Option<ClientUser>, AppError>;
    async fn update_password(&self, db: &ScopedDb, id: Uuid, password_hash: &str) -> Result<(), AppError>;
}

/// One instance per principal kind; the two never share a table.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, db: &ScopedDb, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn find(&self, db: &ScopedDb, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    /// Deletes `old_hash` and inserts `replacement` in one transaction.
    /// Returns `false`, and changes nothing, when `old_hash` was already gone.
    async fn rotate(&self, db: &ScopedDb, old_hash: &str, replacement: &RefreshTokenRecord) -> Result<bool, AppError>;
    async fn delete(&self, db: &ScopedDb, token_hash: &str) -> Result<(), AppError>;
    async fn delete_all_for_principal(&self, db: &ScopedDb, principal_id: Uuid) -> Result<u64, AppError>;
    async fn delete_expired(&self, db: &ScopedDb) -> Result<u64, AppError>;
}

/// Looks up the owner of a refresh token so rotation can refuse inactive principals.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_principal(&self, db: &ScopedDb, id: Uuid) -> Result<Option<Principal>, AppError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list(&self, db: &ScopedDb) -> Result<Vec<Order>, AppError>;
    async fn find_by_id(&self, db: &ScopedDb, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn count(&self, db: &ScopedDb) -> Result<i64, AppError>;
    async fn create(&self, db: &ScopedDb, order: &Order) -> Result<Order, AppError>;
    /// Updates the status and appends a history row in the same transaction.
    async fn update_status(&self, db: &ScopedDb, id: Uuid, status: OrderStatus, changed_by: Uuid) -> Result<Option<Order>, AppError>;
    async fn delete(&self, db: &ScopedDb, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, db: &ScopedDb, event: &AuditEvent) -> Result<(), AppError>;
    async fn list_by_entity(&self, db: &ScopedDb, entity_type: &str, entity_id: &str, limit: i64, offset: i64) -> Result<Vec<AuditEvent>, AppError>;
    async fn list_recent(&self, db: &ScopedDb, limit: i64) -> Result<Vec<AuditEvent>, AppError>;
    async fn list_by_action(&self, db: &ScopedDb, action: AuditAction, limit: i64) -> Result<Vec<AuditEvent>, AppError>;
}
