use axum::{
    body::Body,
    extract::Request,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, audit, auth, health, orders, portal_auth};
use crate::api::middleware::rate_limit::{auth_rate_limit, general_rate_limit};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Credential endpoints get their own, stricter window
    let credential_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/portal/auth/register", post(portal_auth::register))
        .route("/api/portal/auth/login", post(portal_auth::login))
        .route("/api/portal/auth/refresh", post(portal_auth::refresh))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_rate_limit));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))

        // Employee auth
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/memberships", get(auth::memberships))

        // Portal auth
        .route("/api/portal/auth/logout", post(portal_auth::logout))
        .route("/api/portal/auth/me", get(portal_auth::me))
        .route("/api/portal/auth/change-password", post(portal_auth::change_password))

        .merge(credential_routes)

        // Orders
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/count", get(orders::count_orders))
        .route("/api/orders/{order_id}", get(orders::get_order).delete(orders::delete_order))
        .route("/api/orders/{order_id}/status", patch(orders::update_order_status))

        // Audit
        .route("/api/audit", get(audit::list_by_entity))
        .route("/api/audit/recent", get(audit::list_recent))
        .route("/api/audit/actions/{action}", get(audit::list_by_action))

        // Platform admin
        .route("/api/admin/tenants", post(admin::create_tenant))
        .route("/api/admin/tenants/{tenant_id}/status", patch(admin::set_tenant_status))

        .layer(middleware::from_fn_with_state(state.clone(), general_rate_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        tenant_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
