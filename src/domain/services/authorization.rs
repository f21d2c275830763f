//! Role and permission policy, independent of HTTP.

use crate::domain::models::membership::Role;
use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum Requirement<'a> {
    AnyRole(&'a [Role]),
    MinRole(Role),
    Permission(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    DenyRole,
    DenyPermission(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::DenyRole => Err(AppError::InsufficientRole),
            Decision::DenyPermission(name) => Err(AppError::MissingPermission(name)),
        }
    }
}

pub fn evaluate(role: Role, permissions: &[String], requirement: Requirement<'_>) -> Decision {
    match requirement {
        Requirement::AnyRole(allowed) if allowed.contains(&role) => Decision::Allow,
        Requirement::AnyRole(_) => Decision::DenyRole,
        Requirement::MinRole(min) if role.at_least(min) => Decision::Allow,
        Requirement::MinRole(_) => Decision::DenyRole,
        Requirement::Permission(_) if role.has_full_authority() => Decision::Allow,
        Requirement::Permission(name) if permissions.iter().any(|p| p == name) => Decision::Allow,
        Requirement::Permission(name) => Decision::DenyPermission(name.to_string()),
    }
}
