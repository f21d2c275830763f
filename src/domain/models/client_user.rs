use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Portal customer. Lives inside exactly one tenant; email is unique per tenant.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ClientUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ClientUser {
    pub fn new(tenant_id: Uuid, email: String, password_hash: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            email,
            password_hash,
            name,
            active: true,
            created_at: Utc::now(),
        }
    }
}
