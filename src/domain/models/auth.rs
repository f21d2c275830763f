use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::{client_user::ClientUser, user::User};

/// Tag carried inside every access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Employee,
    PortalClient,
}

/// Static description of one credential space.
///
/// The two implementors share every line of token logic but never each
/// other's cookies, audience, refresh table or kind tag.
pub trait PrincipalKind: Send + Sync + 'static {
    const KIND: TokenKind;
    const AUDIENCE: &'static str;
    const ACCESS_COOKIE: &'static str;
    const REFRESH_COOKIE: &'static str;
    const REFRESH_PATH: &'static str;
}

/// Employee users logging into tenant dashboards.
#[derive(Debug, Clone, Copy)]
pub struct Employee;

/// Customers logging into a tenant's self-service portal.
#[derive(Debug, Clone, Copy)]
pub struct Portal;

impl PrincipalKind for Employee {
    const KIND: TokenKind = TokenKind::Employee;
    const AUDIENCE: &'static str = "dockpulse-employee";
    const ACCESS_COOKIE: &'static str = "access_token";
    const REFRESH_COOKIE: &'static str = "refresh_token";
    const REFRESH_PATH: &'static str = "/api/auth/refresh";
}

impl PrincipalKind for Portal {
    const KIND: TokenKind = TokenKind::PortalClient;
    const AUDIENCE: &'static str = "dockpulse-portal";
    const ACCESS_COOKIE: &'static str = "portal_access_token";
    const REFRESH_COOKIE: &'static str = "portal_refresh_token";
    const REFRESH_PATH: &'static str = "/api/portal/auth/refresh";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Phone for employees, email for portal clients.
    pub ident: String,
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Persisted refresh token. Only the SHA-256 of the raw value is ever stored.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The subset of a user or client the token service needs.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub identifier: String,
    pub tenant_id: Option<Uuid>,
    pub active: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            identifier: user.phone.clone(),
            tenant_id: None,
            active: user.active,
        }
    }
}

impl From<&ClientUser> for Principal {
    fn from(client: &ClientUser) -> Self {
        Self {
            id: client.id,
            identifier: client.email.clone(),
            tenant_id: Some(client.tenant_id),
            active: client.active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
