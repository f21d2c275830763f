use std::sync::Arc;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::models::audit::{AuditAction, AuditContext, AuditEntry, AuditEvent};
use crate::domain::ports::AuditRepository;
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;

pub const REDACTED: &str = "[REDACTED]";
pub const MAX_USER_AGENT_CHARS: usize = 255;
pub const MAX_PAGE_SIZE: i64 = 100;

const PII_KEY_FRAGMENTS: [&str; 16] = [
    "phone", "email", "mail", "password", "passwd", "token", "name", "secret",
    "telefon", "haslo", "hasło", "imie", "imię", "nazwisko", "pesel", "adres",
];

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    PII_KEY_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

/// Replaces the value of every PII-looking key, at any depth.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = if is_sensitive_key(&key) { Value::String(REDACTED.to_string()) } else { redact(value) };
                    (key, value)
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

pub fn truncate_user_agent(user_agent: &str) -> String {
    user_agent.chars().take(MAX_USER_AGENT_CHARS).collect()
}

pub struct AuditService {
    repo: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    /// Best effort. Never fails the caller; problems are logged and dropped.
    pub async fn emit(&self, db: &ScopedDb, ctx: &AuditContext, entry: AuditEntry) {
        let Some(tenant_id) = db.tenant_id() else {
            warn!(action = ?entry.action, "Audit event without tenant context skipped");
            return;
        };

        let event = AuditEvent {
            id: Uuid::new_v4(),
            tenant_id,
            principal_id: ctx.principal_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            metadata: entry.metadata.map(redact).unwrap_or_else(|| Value::Object(Map::new())),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.as_deref().map(truncate_user_agent),
            created_at: Utc::now(),
        };

        if let Err(e) = self.repo.insert(db, &event).await {
            error!(action = ?event.action, tenant_id = %tenant_id, "Failed to write audit event: {:?}", e);
        }
    }

    pub async fn by_entity(&self, db: &ScopedDb, entity_type: &str, entity_id: &str, page: i64, per_page: i64) -> Result<Vec<AuditEvent>, AppError> {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let offset = (page.max(1) - 1) * per_page;
        self.repo.list_by_entity(db, entity_type, entity_id, per_page, offset).await
    }

    pub async fn recent(&self, db: &ScopedDb, limit: i64) -> Result<Vec<AuditEvent>, AppError> {
        self.repo.list_recent(db, limit.clamp(1, MAX_PAGE_SIZE)).await
    }

    pub async fn by_action(&self, db: &ScopedDb, action: AuditAction, limit: i64) -> Result<Vec<AuditEvent>, AppError> {
        self.repo.list_by_action(db, action, limit.clamp(1, MAX_PAGE_SIZE)).await
    }
}
