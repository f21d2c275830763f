use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

/// Tenant-scoped. Only ever read or written through a `ScopedDb`.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Order {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(tenant_id: Uuid, number: String, customer_name: String, total_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            customer_name,
            status: OrderStatus::New,
            total_cents,
            created_at: now,
            updated_at: now,
        }
    }
}
