use crate::domain::{
    models::order::{Order, OrderStatus},
    ports::OrderRepository,
};
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

const COLUMNS: &str = "id, tenant_id, number, customer_name, status, total_cents, created_at, updated_at";

/// Row-security scoped. No statement here names a tenant in its predicate.
pub struct PostgresOrderRepo;

#[async_trait]
impl OrderRepository for PostgresOrderRepo {
    async fn list(&self, db: &ScopedDb) -> Result<Vec<Order>, AppError> {
        let mut tx = db.begin().await?;
        let orders = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders ORDER BY created_at DESC"))
            .fetch_all(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(orders)
    }

    async fn find_by_id(&self, db: &ScopedDb, id: Uuid) -> Result<Option<Order>, AppError> {
        let mut tx = db.begin().await?;
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(order)
    }

    async fn count(&self, db: &ScopedDb) -> Result<i64, AppError> {
        let mut tx = db.begin().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(tx.conn())
            .await
            .map_err(AppError::Database)?;
        tx.commit().await?;
        Ok(count)
    }

    async fn create(&self, db: &ScopedDb, order: &Order) -> Result<Order, AppError> {
        let mut tx = db.begin().await?;
        let created = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
        ))
            .bind(order.id)
            .bind(tx.require_tenant()?)
            .bind(&order.number)
            .bind(&order.customer_name)
            .bind(order.status)
            .bind(order.total_cents)
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_one(tx.conn())
            .await
            .map_err(|e| {
                error!("Postgres Order Creation Failed: {:?}", e);
                AppError::Database(e)
            })?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_status(&self, db: &ScopedDb, id: Uuid, status: OrderStatus, changed_by: Uuid) -> Result<Option<Order>, AppError> {
        db.transaction(move |tx| Box::pin(async move {
            let updated = sqlx::query_as::<_, Order>(&format!(
                "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
            ))
                .bind(id)
                .bind(status)
                .fetch_optional(tx.conn())
                .await?;

            let Some(order) = updated else {
                return Ok(None);
            };

            sqlx::query(
                "INSERT INTO order_status_history (id, tenant_id, order_id, status, changed_by, changed_at) VALUES ($1, $2, $3, $4, $5, now())",
            )
                .bind(Uuid::new_v4())
                .bind(tx.require_tenant()?)
                .bind(order.id)
                .bind(status)
                .bind(changed_by)
                .execute(tx.conn())
                .await?;

            Ok(Some(order))
        }))
        .await
    }

    async fn delete(&self, db: &ScopedDb, id: Uuid) -> Result<bool, AppError> {
        let mut tx = db.begin().await?;
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(tx.conn())
            .await
            .map_err(|e| {
                error!("Postgres Order Deletion Failed: {:?}", e);
                AppError::Database(e)
            })?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}
