use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use crate::api::extractors::tenant::MaybeTenant;
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use crate::state::AppState;

/// Request-scoped database handle, pinned to the resolved tenant when there is one.
pub struct Db(pub ScopedDb);

impl FromRequestParts<Arc<AppState>> for Db {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let MaybeTenant(tenant) = MaybeTenant::from_request_parts(parts, state).await?;
        Ok(Db(state.gateway.for_tenant(tenant.as_ref())))
    }
}
