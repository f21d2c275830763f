use serde::Serialize;
use uuid::Uuid;
use crate::domain::models::{
    client_user::ClientUser,
    membership::{Membership, Role},
    tenant::{Tenant, TenantContext},
    user::User,
};

#[derive(Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self { id: user.id, phone: user.phone.clone(), name: user.name.clone() }
    }
}

/// Tokens travel in cookies only; bodies carry the profile.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MembershipView {
    pub role: Role,
    pub permissions: Vec<String>,
}

impl From<Membership> for MembershipView {
    fn from(m: Membership) -> Self {
        Self { role: m.role, permissions: m.permissions }
    }
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub tenant: Option<TenantContext>,
    pub membership: Option<MembershipView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&ClientUser> for ClientProfile {
    fn from(client: &ClientUser) -> Self {
        Self {
            id: client.id,
            tenant_id: client.tenant_id,
            email: client.email.clone(),
            name: client.name.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct PortalAuthResponse {
    pub client: ClientProfile,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantCreatedResponse {
    pub tenant: Tenant,
    pub owner_id: Uuid,
    pub owner_created: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
