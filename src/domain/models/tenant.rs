use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Global, unscoped. `slug` is unique and never updated after creation.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub active: bool,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(slug: String, name: String, plan: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug,
            name,
            active: true,
            plan,
            created_at: Utc::now(),
        }
    }

    pub fn context(&self) -> TenantContext {
        TenantContext {
            id: self.id,
            slug: self.slug.clone(),
            plan: self.plan.clone(),
        }
    }
}

/// Resolved tenant attached to a request. Immutable for the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    pub id: Uuid,
    pub slug: String,
    pub plan: String,
}
