use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{info, warn};
use validator::Validate;
use crate::api::dtos::requests::{ChangePasswordRequest, LoginRequest};
use crate::api::dtos::responses::{AuthResponse, MeResponse, MembershipView, UserProfile};
use crate::api::extractors::{
    auth::AuthUser, maybe_auth::MaybeAuthUser, request_meta::RequestMeta, tenant::MaybeTenant,
};
use crate::domain::models::audit::{AuditAction, AuditEntry};
use crate::domain::models::auth::Principal;
use crate::domain::services::password::{hash_password, verify_or_burn, verify_password};
use crate::error::{AppError, AuthFailure};
use crate::state::AppState;

pub async fn login(
    State(state): State<Arc<AppState>>,
    MaybeTenant(tenant): MaybeTenant,
    meta: RequestMeta,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let db = state.gateway.for_tenant(tenant.as_ref());

    let user = state.user_repo.find_by_phone(payload.phone.trim()).await?;
    let verified = verify_or_burn(&payload.password, user.as_ref().map(|u| u.password_hash.as_str()));

    let user = match user {
        Some(user) if verified && user.active => user,
        other => {
            state.audit.emit(
                &db,
                &meta.audit_context(other.map(|u| u.id)),
                AuditEntry::new(AuditAction::LoginFailed).metadata(json!({ "reason": "invalid_credentials" })),
            ).await;
            return Err(AppError::InvalidCredentials);
        }
    };

    if let Some(tenant) = &tenant {
        let membership = state.membership_repo.find(user.id, tenant.id).await?.filter(|m| m.active);
        if membership.is_none() {
            state.audit.emit(
                &db,
                &meta.audit_context(Some(user.id)),
                AuditEntry::new(AuditAction::LoginFailed).metadata(json!({ "reason": "no_membership" })),
            ).await;
            return Err(AppError::NoMembership);
        }
    }

    let pair = state.employee_tokens.issue(&db, &Principal::from(&user)).await?;
    state.employee_tokens.set_cookies(&cookies, &pair);

    state.audit.emit(&db, &meta.audit_context(Some(user.id)), AuditEntry::new(AuditAction::Login).entity("user", user.id)).await;
    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse { user: UserProfile::from(&user) }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    MaybeTenant(tenant): MaybeTenant,
    meta: RequestMeta,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let db = state.gateway.for_tenant(tenant.as_ref());

    let Some(raw_token) = state.employee_tokens.refresh_cookie_value(&cookies) else {
        state.employee_tokens.clear_cookies(&cookies);
        return Err(AppError::InvalidOrExpiredRefreshToken);
    };

    let (principal, pair) = match state.employee_tokens.rotate(&db, &raw_token).await {
        Ok(rotated) => rotated,
        Err(e) => {
            if matches!(e, AppError::InvalidOrExpiredRefreshToken) {
                state.employee_tokens.clear_cookies(&cookies);
                state.audit.emit(&db, &meta.audit_context(None), AuditEntry::new(AuditAction::TokenRefreshFailed)).await;
            }
            return Err(e);
        }
    };

    state.employee_tokens.set_cookies(&cookies, &pair);
    state.audit.emit(&db, &meta.audit_context(Some(principal.id)), AuditEntry::new(AuditAction::TokenRefresh)).await;
    info!("Token refreshed for user: {}", principal.id);

    let user = state.user_repo.find_by_id(principal.id).await?
        .ok_or(AppError::InvalidOrExpiredRefreshToken)?;
    Ok(Json(AuthResponse { user: UserProfile::from(&user) }))
}

/// Revokes the presented refresh token, or every session of the caller when
/// the refresh cookie is not sent on this path. Always clears cookies.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    MaybeTenant(tenant): MaybeTenant,
    MaybeAuthUser(claims): MaybeAuthUser,
    meta: RequestMeta,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let db = state.gateway.for_tenant(tenant.as_ref());
    let principal_id = claims.as_ref().map(|c| c.sub);

    if let Some(raw_token) = state.employee_tokens.refresh_cookie_value(&cookies) {
        state.employee_tokens.revoke(&db, &raw_token).await?;
    } else if let Some(user_id) = principal_id {
        let revoked = state.employee_tokens.revoke_all(&db, user_id).await?;
        info!("Revoked {} sessions for user {}", revoked, user_id);
    }

    state.employee_tokens.clear_cookies(&cookies);
    state.audit.emit(&db, &meta.audit_context(principal_id), AuditEntry::new(AuditAction::Logout)).await;
    info!("User logged out");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    MaybeTenant(tenant): MaybeTenant,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_id(claims.sub).await?
        .filter(|u| u.active)
        .ok_or(AppError::Unauthenticated(AuthFailure::Invalid))?;

    let membership = match &tenant {
        Some(t) => state.membership_repo.find(user.id, t.id).await?.filter(|m| m.active),
        None => None,
    };

    Ok(Json(MeResponse {
        user: UserProfile::from(&user),
        tenant,
        membership: membership.map(MembershipView::from),
    }))
}

pub async fn memberships(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.membership_repo.list_for_user(claims.sub).await?))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    MaybeTenant(tenant): MaybeTenant,
    AuthUser(claims): AuthUser,
    meta: RequestMeta,
    cookies: Cookies,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let db = state.gateway.for_tenant(tenant.as_ref());

    let user = state.user_repo.find_by_id(claims.sub).await?
        .ok_or(AppError::Unauthenticated(AuthFailure::Invalid))?;

    if !verify_password(&payload.current_password, &user.password_hash) {
        warn!("Password change with wrong current password for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = hash_password(&payload.new_password)?;
    state.user_repo.update_password(user.id, &password_hash).await?;

    let revoked = state.employee_tokens.revoke_all(&db, user.id).await?;
    state.employee_tokens.clear_cookies(&cookies);

    state.audit.emit(&db, &meta.audit_context(Some(user.id)), AuditEntry::new(AuditAction::PasswordChange).entity("user", user.id)).await;
    info!("Password changed for user {}, {} sessions revoked", user.id, revoked);

    Ok(StatusCode::NO_CONTENT)
}
