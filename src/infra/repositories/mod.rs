pub mod postgres_audit_repo;
pub mod postgres_client_user_repo;
pub mod postgres_membership_repo;
pub mod postgres_order_repo;
pub mod postgres_refresh_token_repo;
pub mod postgres_tenant_repo;
pub mod postgres_user_repo;
