use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use crate::api::extractors::{auth::AuthUser, tenant::CurrentTenant};
use crate::domain::models::membership::Role;
use crate::domain::models::tenant::TenantContext;
use crate::domain::services::authorization::{evaluate, Decision, Requirement};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated employee with an active membership in the resolved tenant.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: Uuid,
    pub tenant: TenantContext,
    pub role: Role,
    pub permissions: Vec<String>,
}

impl Member {
    pub fn decide(&self, requirement: Requirement<'_>) -> Decision {
        evaluate(self.role, &self.permissions, requirement)
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        self.decide(Requirement::AnyRole(allowed)).into_result()
    }

    pub fn require_at_least(&self, min: Role) -> Result<(), AppError> {
        self.decide(Requirement::MinRole(min)).into_result()
    }

    pub fn require_permission(&self, name: &str) -> Result<(), AppError> {
        self.decide(Requirement::Permission(name)).into_result()
    }
}

impl FromRequestParts<Arc<AppState>> for Member {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let CurrentTenant(tenant) = CurrentTenant::from_request_parts(parts, state).await?;
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        let membership = state.membership_repo.find(claims.sub, tenant.id).await?
            .filter(|m| m.active)
            .ok_or_else(|| {
                debug!(user_id = %claims.sub, tenant = %tenant.slug, "No active membership");
                AppError::NoMembership
            })?;

        Ok(Member {
            user_id: claims.sub,
            tenant,
            role: membership.role,
            permissions: membership.permissions,
        })
    }
}
