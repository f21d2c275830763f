use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;
use crate::api::dtos::requests::{CreateTenantRequest, SetTenantStatusRequest};
use crate::api::dtos::responses::TenantCreatedResponse;
use crate::api::extractors::{admin::PlatformAdmin, request_meta::RequestMeta};
use crate::domain::models::audit::{AuditAction, AuditEntry};
use crate::domain::models::membership::{Membership, Role};
use crate::domain::models::tenant::Tenant;
use crate::domain::models::user::User;
use crate::domain::services::password::hash_password;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PLAN: &str = "starter";

/// Creates a tenant and makes the given phone its OWNER, reusing an existing user when the phone is known.
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    _admin: PlatformAdmin,
    meta: RequestMeta,
    Json(payload): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if state.tenant_repo.find_by_slug(&payload.slug).await?.is_some() {
        return Err(AppError::Conflict(format!("Slug {} jest zajęty", payload.slug)));
    }

    let plan = payload.plan.unwrap_or_else(|| DEFAULT_PLAN.to_string());
    let tenant = state.tenant_repo.create(&Tenant::new(payload.slug, payload.name, plan)).await?;

    let phone = payload.owner.phone.trim().to_string();
    let (owner, owner_created) = match state.user_repo.find_by_phone(&phone).await? {
        Some(existing) => (existing, false),
        None => {
            let password_hash = hash_password(&payload.owner.password)?;
            let user = User::new(phone, password_hash, payload.owner.name);
            (state.user_repo.create(&user).await?, true)
        }
    };

    state.membership_repo.create(&Membership::new(owner.id, tenant.id, Role::Owner)).await?;

    let db = state.gateway.scoped(tenant.id);
    state.audit.emit(
        &db,
        &meta.audit_context(None),
        AuditEntry::new(AuditAction::TenantCreate)
            .entity("tenant", tenant.id)
            .metadata(json!({ "slug": tenant.slug, "plan": tenant.plan, "ownerCreated": owner_created })),
    ).await;
    info!("Created tenant {} with owner {}", tenant.slug, owner.id);

    Ok((StatusCode::CREATED, Json(TenantCreatedResponse { tenant, owner_id: owner.id, owner_created })))
}

/// Soft (de)activation. A disabled tenant resolves to 403 `TENANT_DISABLED`.
pub async fn set_tenant_status(
    State(state): State<Arc<AppState>>,
    _admin: PlatformAdmin,
    meta: RequestMeta,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<SetTenantStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state.tenant_repo.set_active(tenant_id, payload.active).await?
        .ok_or(AppError::NotFound("Tenant not found".into()))?;

    state.audit.emit(
        &state.gateway.scoped(tenant.id),
        &meta.audit_context(None),
        AuditEntry::new(AuditAction::TenantStatusChange)
            .entity("tenant", tenant.id)
            .metadata(json!({ "active": tenant.active })),
    ).await;
    info!("Tenant {} active={}", tenant.slug, tenant.active);

    Ok(Json(tenant))
}
