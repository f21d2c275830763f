use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::Span;
use crate::domain::models::auth::Claims;
use crate::error::{AppError, AuthFailure};
use crate::state::AppState;

/// Authenticated employee, from the `access_token` cookie.
pub struct AuthUser(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(AppError::InternalWithMsg("cookie layer missing".into()))?;

        let access_token = state.employee_tokens.access_cookie_value(cookies)
            .ok_or(AppError::Unauthenticated(AuthFailure::NoToken))?;

        let claims = state.employee_tokens.verify(&access_token)
            .map_err(AppError::Unauthenticated)?;

        Span::current().record("user_id", tracing::field::display(claims.sub));

        Ok(AuthUser(claims))
    }
}
