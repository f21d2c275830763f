use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::debug;
use crate::domain::models::auth::Claims;
use crate::state::AppState;

/// Employee claims when a valid access cookie is present. Never rejects.
pub struct MaybeAuthUser(pub Option<Claims>);

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(token) = parts.extensions.get::<Cookies>()
            .and_then(|cookies| state.employee_tokens.access_cookie_value(cookies))
        else {
            return Ok(MaybeAuthUser(None));
        };

        match state.employee_tokens.verify(&token) {
            Ok(claims) => Ok(MaybeAuthUser(Some(claims))),
            Err(failure) => {
                // Bad or expired token -> treat as guest
                debug!("MaybeAuth: ignoring token ({})", failure.code());
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
