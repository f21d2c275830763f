//! Tenant-scoped database access.
//!
//! Every statement that touches a tenant-scoped table runs inside a
//! transaction whose first statement pins `app.current_tenant` with
//! `set_config(.., true)`. The setting is transaction-local, so it is gone
//! by the time the connection returns to the pool. Row-level security
//! policies on those tables read the setting; repositories never filter by
//! tenant themselves.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::models::tenant::TenantContext;
use crate::error::AppError;

pub const TENANT_SETTING: &str = "app.current_tenant";

pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 't>>;

/// Hands out request-scoped handles over the shared pool.
#[derive(Clone)]
pub struct TenantGateway {
    pool: PgPool,
    statement_timeout: Duration,
    app_role: Option<Arc<str>>,
}

impl TenantGateway {
    pub fn new(pool: PgPool, statement_timeout: Duration, app_role: Option<String>) -> Self {
        Self {
            pool,
            statement_timeout,
            app_role: app_role.map(Arc::from),
        }
    }

    pub fn scoped(&self, tenant_id: Uuid) -> ScopedDb {
        self.handle(Some(tenant_id))
    }

    /// For code paths that never touch tenant-scoped tables. Under the
    /// row-security policies such a handle sees no tenant rows at all.
    pub fn unscoped(&self) -> ScopedDb {
        self.handle(None)
    }

    pub fn for_tenant(&self, tenant: Option<&TenantContext>) -> ScopedDb {
        self.handle(tenant.map(|t| t.id))
    }

    /// Raw pool for repositories over global tables (tenants, users, memberships).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn handle(&self, tenant_id: Option<Uuid>) -> ScopedDb {
        ScopedDb {
            pool: self.pool.clone(),
            tenant_id,
            statement_timeout: self.statement_timeout,
            app_role: self.app_role.clone(),
        }
    }
}

/// Database handle bound to at most one tenant for the lifetime of a request.
#[derive(Clone)]
pub struct ScopedDb {
    pool: PgPool,
    tenant_id: Option<Uuid>,
    statement_timeout: Duration,
    app_role: Option<Arc<str>>,
}

impl ScopedDb {
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    pub fn is_scoped(&self) -> bool {
        self.tenant_id.is_some()
    }

    /// Opens a transaction with the tenant pinned. If any pin statement
    /// fails the transaction is dropped, which rolls it back.
    pub async fn begin(&self) -> Result<ScopedTx, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(role) = &self.app_role {
            sqlx::query("SELECT set_config('role', $1, true)")
                .bind(role.as_ref())
                .execute(&mut *tx)
                .await?;
        }

        let pin = self.tenant_id.map(|id| id.to_string()).unwrap_or_default();
        sqlx::query("SELECT set_config($1, $2, true), set_config('statement_timeout', $3, true)")
            .bind(TENANT_SETTING)
            .bind(&pin)
            .bind(self.statement_timeout.as_millis().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to pin tenant {:?}: {:?}", self.tenant_id, e);
                AppError::Database(e)
            })?;

        debug!(tenant_id = ?self.tenant_id, "scoped transaction opened");

        Ok(ScopedTx {
            tx,
            tenant_id: self.tenant_id,
        })
    }

    /// Runs `f` inside one pinned transaction. Commits on `Ok`, rolls back on `Err`.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut ScopedTx) -> TxFuture<'t, T> + Send,
    {
        let mut tx = self.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback().await;
                Err(e)
            }
        }
    }
}

/// An open, pinned transaction. Dropping it without `commit` rolls back.
pub struct ScopedTx {
    tx: Transaction<'static, Postgres>,
    tenant_id: Option<Uuid>,
}

impl ScopedTx {
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    /// Tenant id for inserts. The row-security `WITH CHECK` clause verifies it again.
    pub fn require_tenant(&self) -> Result<Uuid, AppError> {
        self.tenant_id.ok_or(AppError::MissingTenantIdentifier)
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }

    pub async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            error!("Rollback failed: {:?}", e);
        }
    }
}
