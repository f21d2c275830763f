use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

/// Tenant role. Ordered: `Owner > Admin > Manager > Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "membership_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Member,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Member => 1,
        }
    }

    /// True when `self` is at least as privileged as `other`.
    pub fn at_least(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    /// Owners and admins hold every permission by construction.
    pub fn has_full_authority(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Member => "MEMBER",
        };
        f.write_str(name)
    }
}

pub mod permissions {
    pub const ORDER_CREATE: &str = "ORDER_CREATE";
    pub const ORDER_CHANGE_STATUS: &str = "ORDER_CHANGE_STATUS";
    pub const AUDIT_VIEW: &str = "AUDIT_VIEW";

    pub const ALL: [&str; 3] = [ORDER_CREATE, ORDER_CHANGE_STATUS, AUDIT_VIEW];
}

/// Join of a user to a tenant. At most one row per `(user_id, tenant_id)`.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub permissions: Vec<String>,
    pub active: bool,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            role,
            permissions: Vec::new(),
            active: true,
            accepted_at: Some(now),
            created_at: now,
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Membership joined with the tenant it grants access to, for the tenant picker.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct MembershipSummary {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_name: String,
    pub role: Role,
    pub permissions: Vec<String>,
}
