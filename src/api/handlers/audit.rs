use axum::{extract::{Path, Query, State}, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;
use crate::api::dtos::requests::{AuditEntityQuery, LimitQuery};
use crate::api::extractors::{db::Db, membership::Member, request_meta::RequestMeta};
use crate::api::handlers::authorize;
use crate::domain::models::audit::AuditAction;
use crate::domain::models::membership::permissions;
use crate::domain::services::authorization::Requirement;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const DEFAULT_LIMIT: i64 = 50;

pub async fn list_by_entity(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Query(query): Query<AuditEntityQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::Permission(permissions::AUDIT_VIEW)).await?;
    query.validate()?;

    let events = state.audit.by_entity(
        &db,
        &query.entity_type,
        &query.entity_id,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
    ).await?;
    Ok(Json(events))
}

pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::Permission(permissions::AUDIT_VIEW)).await?;
    Ok(Json(state.audit.recent(&db, query.limit.unwrap_or(DEFAULT_LIMIT)).await?))
}

pub async fn list_by_action(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Path(action): Path<AuditAction>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::Permission(permissions::AUDIT_VIEW)).await?;
    Ok(Json(state.audit.by_action(&db, action, query.limit.unwrap_or(DEFAULT_LIMIT)).await?))
}
