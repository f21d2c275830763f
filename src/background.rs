use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, info_span, Instrument};
use crate::error::AppError;
use crate::state::AppState;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodic housekeeping: expired refresh tokens and idle rate-limit windows.
pub async fn start_maintenance_worker(state: Arc<AppState>) {
    info!("Starting maintenance worker...");

    let mut ticker = interval(MAINTENANCE_INTERVAL);
    loop {
        ticker.tick().await;

        let span = info_span!("maintenance");
        async {
            match purge_expired_tokens(&state).await {
                Ok((employee, portal)) => info!(employee, portal, "Expired refresh tokens purged"),
                Err(e) => error!("Refresh token purge failed: {:?}", e),
            }
            state.general_limiter.prune_idle();
            state.auth_limiter.prune_idle();
        }
            .instrument(span)
            .await;
    }
}

/// Employee tokens live in a global table. Portal tokens are row-security
/// scoped, so they are purged one tenant at a time, disabled tenants included.
pub async fn purge_expired_tokens(state: &AppState) -> Result<(u64, u64), AppError> {
    let employee = state.employee_tokens.purge_expired(&state.gateway.unscoped()).await?;

    let mut portal = 0;
    for tenant_id in state.tenant_repo.list_ids().await? {
        match state.portal_tokens.purge_expired(&state.gateway.scoped(tenant_id)).await {
            Ok(n) => portal += n,
            Err(e) => error!(tenant_id = %tenant_id, "Portal token purge failed: {:?}", e),
        }
    }
    Ok((employee, portal))
}
