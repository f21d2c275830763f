use std::sync::Arc;
use crate::config::Config;
use crate::domain::models::auth::{Employee, Portal};
use crate::domain::ports::{
    AuditRepository, ClientUserRepository, MembershipRepository, OrderRepository,
    RefreshTokenRepository, TenantRepository, UserRepository,
};
use crate::domain::services::audit_service::AuditService;
use crate::domain::services::rate_limiter::SlidingWindowLimiter;
use crate::domain::services::tenant_resolver::TenantResolver;
use crate::domain::services::token_service::{EmployeeDirectory, PortalDirectory, TokenService};
use crate::infra::gateway::TenantGateway;

/// Every persistence adapter the application needs.
pub struct Repositories {
    pub tenants: Arc<dyn TenantRepository>,
    pub users: Arc<dyn UserRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub client_users: Arc<dyn ClientUserRepository>,
    pub employee_refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub portal_refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: TenantGateway,
    pub tenant_repo: Arc<dyn TenantRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub membership_repo: Arc<dyn MembershipRepository>,
    pub client_user_repo: Arc<dyn ClientUserRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    pub tenant_resolver: Arc<TenantResolver>,
    pub employee_tokens: Arc<TokenService<Employee>>,
    pub portal_tokens: Arc<TokenService<Portal>>,
    pub audit: Arc<AuditService>,
    pub general_limiter: Arc<SlidingWindowLimiter>,
    pub auth_limiter: Arc<SlidingWindowLimiter>,
}

impl AppState {
    pub fn assemble(config: Config, gateway: TenantGateway, repos: Repositories) -> Self {
        let employee_tokens = TokenService::new(
            repos.employee_refresh_tokens,
            Arc::new(EmployeeDirectory(repos.users.clone())),
            &config,
        );
        let portal_tokens = TokenService::new(
            repos.portal_refresh_tokens,
            Arc::new(PortalDirectory(repos.client_users.clone())),
            &config,
        );

        Self {
            tenant_resolver: Arc::new(TenantResolver::new(repos.tenants.clone(), config.public_domain.clone())),
            employee_tokens: Arc::new(employee_tokens),
            portal_tokens: Arc::new(portal_tokens),
            audit: Arc::new(AuditService::new(repos.audit)),
            general_limiter: Arc::new(SlidingWindowLimiter::new(config.rate_limit_window, config.rate_limit_max)),
            auth_limiter: Arc::new(SlidingWindowLimiter::new(config.auth_rate_limit_window, config.auth_rate_limit_max)),
            tenant_repo: repos.tenants,
            user_repo: repos.users,
            membership_repo: repos.memberships,
            client_user_repo: repos.client_users,
            order_repo: repos.orders,
            gateway,
            config,
        }
    }
}
