use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    TokenRefresh,
    TokenRefreshFailed,
    PasswordChange,
    PortalRegister,
    PortalLogin,
    PortalLoginFailed,
    PortalLogout,
    PortalPasswordChange,
    OrderCreate,
    OrderStatusChange,
    OrderDelete,
    AccessDenied,
    TenantCreate,
    TenantStatusChange,
}

/// Append-only. Never updated or deleted by the application.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AuditEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub principal_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub metadata: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a caller reports; the audit service fills in the rest.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction) -> Self {
        Self { action, entity_type: None, entity_id: None, metadata: None }
    }

    pub fn entity(mut self, entity_type: &str, entity_id: impl ToString) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Who did it and from where.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub principal_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
