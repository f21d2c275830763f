use serde::Deserialize;
use validator::{Validate, ValidationError};
use crate::domain::models::order::OrderStatus;
use crate::domain::services::tenant_resolver::is_valid_slug;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 256))]
    pub current_password: String,
    #[validate(length(min = 8, max = 256, message = "Hasło musi mieć co najmniej 8 znaków"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PortalRegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256, message = "Hasło musi mieć co najmniej 8 znaków"))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PortalLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 40))]
    pub number: String,
    #[validate(length(min = 1, max = 120))]
    pub customer_name: String,
    #[validate(range(min = 0))]
    pub total_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntityQuery {
    #[validate(length(min = 1, max = 64))]
    pub entity_type: String,
    #[validate(length(min = 1, max = 64))]
    pub entity_id: String,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 40))]
    pub plan: Option<String>,
    #[validate(nested)]
    pub owner: TenantOwnerRequest,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TenantOwnerRequest {
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetTenantStatusRequest {
    pub active: bool,
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) && !["www", "app", "admin", "api"].contains(&slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}
