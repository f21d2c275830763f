use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;
use crate::error::AppError;
use crate::state::AppState;

pub const PLATFORM_KEY_HEADER: &str = "x-platform-key";

/// Operator access to platform endpoints. Disabled unless `PLATFORM_ADMIN_KEY` is set.
pub struct PlatformAdmin;

impl FromRequestParts<Arc<AppState>> for PlatformAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let expected = state.config.platform_admin_key.as_deref().ok_or(AppError::Forbidden)?;

        let presented = parts.headers
            .get(PLATFORM_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if bool::from(presented.ct_eq(expected.as_bytes())) {
            Ok(PlatformAdmin)
        } else {
            warn!("Rejected platform admin request");
            Err(AppError::Forbidden)
        }
    }
}
