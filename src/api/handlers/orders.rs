use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;
use crate::api::dtos::requests::{CreateOrderRequest, UpdateOrderStatusRequest};
use crate::api::dtos::responses::CountResponse;
use crate::api::extractors::{db::Db, membership::Member, request_meta::RequestMeta};
use crate::api::handlers::authorize;
use crate::domain::models::audit::{AuditAction, AuditEntry};
use crate::domain::models::membership::{permissions, Role};
use crate::domain::models::order::Order;
use crate::domain::services::authorization::Requirement;
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _member: Member,
    Db(db): Db,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.order_repo.list(&db).await?))
}

/// Another tenant's order is indistinguishable from a missing one.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    _member: Member,
    Db(db): Db,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.order_repo.find_by_id(&db, order_id).await?
        .ok_or(AppError::NotFound("Order not found".into()))?;
    Ok(Json(order))
}

pub async fn count_orders(
    State(state): State<Arc<AppState>>,
    _member: Member,
    Db(db): Db,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(CountResponse { count: state.order_repo.count(&db).await? }))
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::Permission(permissions::ORDER_CREATE)).await?;
    payload.validate()?;

    let order = Order::new(member.tenant.id, payload.number, payload.customer_name, payload.total_cents);
    let created = state.order_repo.create(&db, &order).await?;

    state.audit.emit(
        &db,
        &meta.audit_context(Some(member.user_id)),
        AuditEntry::new(AuditAction::OrderCreate)
            .entity("order", created.id)
            .metadata(json!({ "number": created.number, "totalCents": created.total_cents })),
    ).await;
    info!("Created order {} in tenant {}", created.id, member.tenant.slug);

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::Permission(permissions::ORDER_CHANGE_STATUS)).await?;

    let updated = state.order_repo.update_status(&db, order_id, payload.status, member.user_id).await?
        .ok_or(AppError::NotFound("Order not found".into()))?;

    state.audit.emit(
        &db,
        &meta.audit_context(Some(member.user_id)),
        AuditEntry::new(AuditAction::OrderStatusChange)
            .entity("order", updated.id)
            .metadata(json!({ "status": updated.status })),
    ).await;

    Ok(Json(updated))
}

pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    member: Member,
    Db(db): Db,
    meta: RequestMeta,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &db, &member, &meta, Requirement::AnyRole(&[Role::Owner, Role::Admin])).await?;

    if !state.order_repo.delete(&db, order_id).await? {
        return Err(AppError::NotFound("Order not found".into()));
    }

    state.audit.emit(
        &db,
        &meta.audit_context(Some(member.user_id)),
        AuditEntry::new(AuditAction::OrderDelete).entity("order", order_id),
    ).await;
    info!("Deleted order {} in tenant {}", order_id, member.tenant.slug);

    Ok(StatusCode::NO_CONTENT)
}
