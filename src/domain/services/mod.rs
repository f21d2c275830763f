pub mod audit_service;
pub mod authorization;
pub mod password;
pub mod rate_limiter;
pub mod tenant_resolver;
pub mod token_service;
