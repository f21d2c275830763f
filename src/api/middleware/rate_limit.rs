//! Edge throttling. Keys come from the raw slug, so a flood never reaches
//! the database just to be counted.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use crate::api::extractors::request_meta::{peer_ip, throttle_ip};
use crate::domain::services::rate_limiter::{RateDecision, SlidingWindowLimiter};
use crate::domain::services::tenant_resolver::slug_from_headers;
use crate::error::AppError;
use crate::state::AppState;

const EXEMPT_PATHS: [&str; 2] = ["/health", "/api/health"];

/// Credential payloads are a handful of short fields.
const MAX_CREDENTIAL_BODY: usize = 16 * 1024;

const IDENTIFIER_FIELDS: [&str; 2] = ["phone", "email"];

/// Per-tenant window for all API traffic; tenantless requests count per IP.
pub async fn general_rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let key = match slug_from_headers(request.headers(), &state.config.public_domain) {
        Some(slug) => format!("tenant:{}", slug),
        None => format!("ip:{}", client_key(&state, &request)),
    };

    match check(&state.general_limiter, &key, request.uri().path()) {
        Ok(()) => next.run(request).await,
        Err(limited) => limited,
    }
}

/// Stricter windows for credential endpoints: one per tenant and client IP,
/// and one per tenant and the phone or email named in the body.
pub async fn auth_rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let slug = slug_from_headers(request.headers(), &state.config.public_domain).unwrap_or_default();
    let path = request.uri().path().to_string();

    // IP first: a limited peer never gets to open identifier windows
    let ip_key = format!("auth:{}:ip:{}", slug, client_key(&state, &request));
    if let Err(limited) = check(&state.auth_limiter, &ip_key, &path) {
        return limited;
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_CREDENTIAL_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => return AppError::BadRequest("request body too large".into()).into_response(),
    };

    if let Some(identifier) = credential_identifier(&bytes) {
        let id_key = format!("auth:{}:id:{}", slug, identifier);
        if let Err(limited) = check(&state.auth_limiter, &id_key, &path) {
            return limited;
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn check(limiter: &SlidingWindowLimiter, key: &str, path: &str) -> Result<(), Response> {
    match limiter.check(key) {
        RateDecision::Allowed { .. } => Ok(()),
        RateDecision::Limited { retry_after } => {
            warn!(key = %key, path = %path, "Rate limit exceeded");
            let retry_after_secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            Err(AppError::RateLimitExceeded { retry_after_secs }.into_response())
        }
    }
}

fn client_key(state: &AppState, request: &Request) -> String {
    throttle_ip(request.headers(), peer_ip(request.extensions()), state.config.trust_proxy)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Phone or email from a JSON credential body, normalized the way lookups are.
fn credential_identifier(body: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    IDENTIFIER_FIELDS
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(|raw| raw.trim().to_lowercase())
        .filter(|id| !id.is_empty())
}
