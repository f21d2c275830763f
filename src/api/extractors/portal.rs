use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{warn, Span};
use crate::api::extractors::tenant::CurrentTenant;
use crate::domain::models::auth::Claims;
use crate::domain::models::tenant::TenantContext;
use crate::error::{AppError, AuthFailure};
use crate::state::AppState;

/// Authenticated portal client inside the tenant that issued its token.
pub struct PortalClient {
    pub claims: Claims,
    pub tenant: TenantContext,
}

impl FromRequestParts<Arc<AppState>> for PortalClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let CurrentTenant(tenant) = CurrentTenant::from_request_parts(parts, state).await?;

        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(AppError::InternalWithMsg("cookie layer missing".into()))?;

        let access_token = state.portal_tokens.access_cookie_value(cookies)
            .ok_or(AppError::Unauthenticated(AuthFailure::NoToken))?;

        let claims = state.portal_tokens.verify(&access_token)
            .map_err(AppError::Unauthenticated)?;

        if claims.tid != Some(tenant.id) {
            warn!(client_id = %claims.sub, tenant = %tenant.slug, "Portal token used outside its tenant");
            return Err(AppError::TenantMismatch);
        }

        Span::current().record("user_id", tracing::field::display(claims.sub));

        Ok(PortalClient { claims, tenant })
    }
}
