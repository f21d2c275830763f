pub mod admin;
pub mod audit;
pub mod auth;
pub mod health;
pub mod orders;
pub mod portal_auth;

use serde_json::json;
use crate::api::extractors::{membership::Member, request_meta::RequestMeta};
use crate::domain::models::audit::{AuditAction, AuditEntry};
use crate::domain::services::authorization::Requirement;
use crate::error::AppError;
use crate::infra::gateway::ScopedDb;
use crate::state::AppState;

/// Applies `requirement` to `member`, recording an `ACCESS_DENIED` event on refusal.
pub(crate) async fn authorize(
    state: &AppState,
    db: &ScopedDb,
    member: &Member,
    meta: &RequestMeta,
    requirement: Requirement<'_>,
) -> Result<(), AppError> {
    let decision = member.decide(requirement);
    if !decision.is_allowed() {
        state.audit.emit(
            db,
            &meta.audit_context(Some(member.user_id)),
            AuditEntry::new(AuditAction::AccessDenied)
                .metadata(json!({ "requirement": format!("{:?}", requirement), "role": member.role })),
        ).await;
    }
    decision.into_result()
}
