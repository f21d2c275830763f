use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// Why a bearer credential was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    NoToken,
    Expired,
    Invalid,
}

impl AuthFailure {
    pub fn code(self) -> &'static str {
        match self {
            AuthFailure::NoToken => "NO_TOKEN",
            AuthFailure::Expired => "TOKEN_EXPIRED",
            AuthFailure::Invalid => "INVALID_TOKEN",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Missing tenant identifier")]
    MissingTenantIdentifier,
    #[error("Tenant not found")]
    TenantNotFound,
    #[error("Tenant disabled")]
    TenantDisabled,
    #[error("Unauthenticated: {}", .0.code())]
    Unauthenticated(AuthFailure),
    #[error("No membership in tenant")]
    NoMembership,
    #[error("Token issued for another tenant")]
    TenantMismatch,
    #[error("Insufficient role")]
    InsufficientRole,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredRefreshToken,
    #[error("Invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Invalid input: {0}")]
    BadRequest(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(e) => match db_error_code(e).as_deref() {
                Some("23505") => StatusCode::CONFLICT,
                Some("42501") => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::MissingTenantIdentifier => StatusCode::BAD_REQUEST,
            AppError::TenantNotFound => StatusCode::NOT_FOUND,
            AppError::TenantDisabled => StatusCode::FORBIDDEN,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NoMembership
            | AppError::TenantMismatch
            | AppError::InsufficientRole
            | AppError::MissingPermission(_)
            | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials | AppError::InvalidOrExpiredRefreshToken => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal | AppError::InternalWithMsg(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable, language-neutral code clients branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(e) => match db_error_code(e).as_deref() {
                Some("23505") => "CONFLICT",
                Some("42501") => "POLICY_VIOLATION",
                _ => "INTERNAL",
            },
            AppError::MissingTenantIdentifier => "MISSING_TENANT",
            AppError::TenantNotFound => "TENANT_NOT_FOUND",
            AppError::TenantDisabled => "TENANT_DISABLED",
            AppError::Unauthenticated(failure) => failure.code(),
            AppError::NoMembership => "NO_MEMBERSHIP",
            AppError::TenantMismatch => "TENANT_MISMATCH",
            AppError::InsufficientRole => "INSUFFICIENT_ROLE",
            AppError::MissingPermission(_) => "MISSING_PERMISSION",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidOrExpiredRefreshToken => "INVALID_REFRESH_TOKEN",
            AppError::Validation(_) | AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::RateLimitExceeded { .. } => "RATE_LIMITED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Internal | AppError::InternalWithMsg(_) => "INTERNAL",
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Database(e) => match db_error_code(e).as_deref() {
                Some("23505") => "Zasób już istnieje".to_string(),
                Some("42501") => "Operacja niedozwolona przez politykę dostępu".to_string(),
                _ => "Wewnętrzny błąd serwera".to_string(),
            },
            AppError::MissingTenantIdentifier => "Brak identyfikatora firmy".to_string(),
            AppError::TenantNotFound => "Nie znaleziono firmy".to_string(),
            AppError::TenantDisabled => "Konto firmy jest nieaktywne".to_string(),
            AppError::Unauthenticated(AuthFailure::NoToken) => "Brak tokenu uwierzytelniającego".to_string(),
            AppError::Unauthenticated(AuthFailure::Expired) => "Token wygasł".to_string(),
            AppError::Unauthenticated(AuthFailure::Invalid) => "Nieprawidłowy token".to_string(),
            AppError::NoMembership => "Brak dostępu do tej firmy".to_string(),
            AppError::TenantMismatch => "Token należy do innej firmy".to_string(),
            AppError::InsufficientRole => "Niewystarczające uprawnienia".to_string(),
            AppError::MissingPermission(_) => "Brak wymaganego uprawnienia".to_string(),
            AppError::InvalidCredentials => "Nieprawidłowe dane logowania".to_string(),
            AppError::InvalidOrExpiredRefreshToken => "Sesja wygasła, zaloguj się ponownie".to_string(),
            AppError::Validation(_) | AppError::BadRequest(_) => "Nieprawidłowe dane wejściowe".to_string(),
            AppError::RateLimitExceeded { .. } => "Zbyt wiele żądań, spróbuj ponownie później".to_string(),
            AppError::NotFound(_) => "Nie znaleziono zasobu".to_string(),
            AppError::Conflict(_) => "Konflikt danych".to_string(),
            AppError::Forbidden => "Brak dostępu".to_string(),
            AppError::Internal | AppError::InternalWithMsg(_) => "Wewnętrzny błąd serwera".to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => Some(json!(msg)),
            AppError::MissingPermission(name) => Some(json!({ "permission": name })),
            _ => None,
        }
    }
}

fn db_error_code(e: &sqlx::Error) -> Option<String> {
    e.as_database_error().and_then(|db| db.code()).map(|c| c.into_owned())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Database(e) if status.is_server_error() => error!("Database error: {:?}", e),
            AppError::Database(e) => warn!("Database rejected statement: {}", e),
            AppError::InternalWithMsg(msg) => error!("Internal error: {}", msg),
            _ => {}
        }

        let mut body = json!({
            "error": self.message(),
            "code": self.code(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimitExceeded { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
