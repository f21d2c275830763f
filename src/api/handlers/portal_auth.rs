use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{info, warn};
use validator::Validate;
use crate::api::dtos::requests::{ChangePasswordRequest, PortalLoginRequest, PortalRegisterRequest};
use crate::api::dtos::responses::{ClientProfile, PortalAuthResponse};
use crate::api::extractors::{db::Db, portal::PortalClient, request_meta::RequestMeta, tenant::CurrentTenant};
use crate::domain::models::audit::{AuditAction, AuditEntry};
use crate::domain::models::auth::Principal;
use crate::domain::models::client_user::ClientUser;
use crate::domain::services::password::{hash_password, verify_or_burn, verify_password};
use crate::error::{AppError, AuthFailure};
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    CurrentTenant(tenant): CurrentTenant,
    Db(db): Db,
    meta: RequestMeta,
    cookies: Cookies,
    Json(payload): Json<PortalRegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    if state.client_user_repo.find_by_email(&db, &email).await?.is_some() {
        return Err(AppError::Conflict("Konto z tym adresem już istnieje".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let client = ClientUser::new(tenant.id, email, password_hash, payload.name.trim().to_string());
    let created = state.client_user_repo.create(&db, &client).await?;

    let pair = state.portal_tokens.issue(&db, &Principal::from(&created)).await?;
    state.portal_tokens.set_cookies(&cookies, &pair);

    state.audit.emit(
        &db,
        &meta.audit_context(Some(created.id)),
        AuditEntry::new(AuditAction::PortalRegister).entity("client_user", created.id),
    ).await;
    info!("Portal client registered: {}", created.id);

    Ok((StatusCode::CREATED, Json(PortalAuthResponse { client: ClientProfile::from(&created) })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentTenant(_tenant): CurrentTenant,
    Db(db): Db,
    meta: RequestMeta,
    cookies: Cookies,
    Json(payload): Json<PortalLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let client = state.client_user_repo.find_by_email(&db, &email).await?;
    let verified = verify_or_burn(&payload.password, client.as_ref().map(|c| c.password_hash.as_str()));

    let client = match client {
        Some(client) if verified && client.active => client,
        other => {
            state.audit.emit(
                &db,
                &meta.audit_context(other.map(|c| c.id)),
                AuditEntry::new(AuditAction::PortalLoginFailed).metadata(json!({ "reason": "invalid_credentials" })),
            ).await;
            return Err(AppError::InvalidCredentials);
        }
    };

    let pair = state.portal_tokens.issue(&db, &Principal::from(&client)).await?;
    state.portal_tokens.set_cookies(&cookies, &pair);

    state.audit.emit(
        &db,
        &meta.audit_context(Some(client.id)),
        AuditEntry::new(AuditAction::PortalLogin).entity("client_user", client.id),
    ).await;
    info!("Portal client logged in: {}", client.id);

    Ok(Json(PortalAuthResponse { client: ClientProfile::from(&client) }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    CurrentTenant(_tenant): CurrentTenant,
    Db(db): Db,
    meta: RequestMeta,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let Some(raw_token) = state.portal_tokens.refresh_cookie_value(&cookies) else {
        state.portal_tokens.clear_cookies(&cookies);
        return Err(AppError::InvalidOrExpiredRefreshToken);
    };

    let (principal, pair) = match state.portal_tokens.rotate(&db, &raw_token).await {
        Ok(rotated) => rotated,
        Err(e) => {
            if matches!(e, AppError::InvalidOrExpiredRefreshToken) {
                state.portal_tokens.clear_cookies(&cookies);
                state.audit.emit(&db, &meta.audit_context(None), AuditEntry::new(AuditAction::TokenRefreshFailed)).await;
            }
            return Err(e);
        }
    };

    state.portal_tokens.set_cookies(&cookies, &pair);
    state.audit.emit(&db, &meta.audit_context(Some(principal.id)), AuditEntry::new(AuditAction::TokenRefresh)).await;

    let client = state.client_user_repo.find_by_id(&db, principal.id).await?
        .ok_or(AppError::InvalidOrExpiredRefreshToken)?;
    Ok(Json(PortalAuthResponse { client: ClientProfile::from(&client) }))
}

/// Same revocation rules as the employee logout, within the portal's own token space.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentTenant(tenant): CurrentTenant,
    Db(db): Db,
    meta: RequestMeta,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let principal_id = state.portal_tokens.access_cookie_value(&cookies)
        .and_then(|token| state.portal_tokens.verify(&token).ok())
        .filter(|claims| claims.tid == Some(tenant.id))
        .map(|claims| claims.sub);

    if let Some(raw_token) = state.portal_tokens.refresh_cookie_value(&cookies) {
        state.portal_tokens.revoke(&db, &raw_token).await?;
    } else if let Some(client_id) = principal_id {
        state.portal_tokens.revoke_all(&db, client_id).await?;
    }

    state.portal_tokens.clear_cookies(&cookies);
    state.audit.emit(&db, &meta.audit_context(principal_id), AuditEntry::new(AuditAction::PortalLogout)).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    portal: PortalClient,
    Db(db): Db,
) -> Result<impl IntoResponse, AppError> {
    let client = state.client_user_repo.find_by_id(&db, portal.claims.sub).await?
        .filter(|c| c.active)
        .ok_or(AppError::Unauthenticated(AuthFailure::Invalid))?;

    Ok(Json(PortalAuthResponse { client: ClientProfile::from(&client) }))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    portal: PortalClient,
    Db(db): Db,
    meta: RequestMeta,
    cookies: Cookies,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = state.client_user_repo.find_by_id(&db, portal.claims.sub).await?
        .ok_or(AppError::Unauthenticated(AuthFailure::Invalid))?;

    if !verify_password(&payload.current_password, &client.password_hash) {
        warn!("Portal password change with wrong current password for client {}", client.id);
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = hash_password(&payload.new_password)?;
    state.client_user_repo.update_password(&db, client.id, &password_hash).await?;
    state.portal_tokens.revoke_all(&db, client.id).await?;
    state.portal_tokens.clear_cookies(&cookies);

    state.audit.emit(
        &db,
        &meta.audit_context(Some(client.id)),
        AuditEntry::new(AuditAction::PortalPasswordChange).entity("client_user", client.id),
    ).await;

    Ok(StatusCode::NO_CONTENT)
}
