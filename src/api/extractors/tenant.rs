use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tracing::Span;
use crate::domain::models::tenant::TenantContext;
use crate::error::AppError;
use crate::state::AppState;

/// Cached in request extensions so every extractor shares one lookup.
#[derive(Clone)]
struct ResolvedTenant(Option<TenantContext>);

async fn resolve(parts: &mut Parts, state: &Arc<AppState>) -> Result<Option<TenantContext>, AppError> {
    if let Some(ResolvedTenant(tenant)) = parts.extensions.get::<ResolvedTenant>() {
        return Ok(tenant.clone());
    }

    let tenant = state.tenant_resolver.resolve(&parts.headers).await?;
    if let Some(t) = &tenant {
        Span::current().record("tenant_id", tracing::field::display(t.id));
    }
    parts.extensions.insert(ResolvedTenant(tenant.clone()));
    Ok(tenant)
}

/// Tenant is mandatory: no slug in host or header is a 400.
pub struct CurrentTenant(pub TenantContext);

impl FromRequestParts<Arc<AppState>> for CurrentTenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?
            .map(CurrentTenant)
            .ok_or(AppError::MissingTenantIdentifier)
    }
}

/// Proceeds without a tenant only when none was named. A named but unknown
/// or disabled tenant is still rejected.
pub struct MaybeTenant(pub Option<TenantContext>);

impl FromRequestParts<Arc<AppState>> for MaybeTenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(MaybeTenant(resolve(parts, state).await?))
    }
}
