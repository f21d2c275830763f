use std::sync::Arc;
use axum::http::{header, HeaderMap};
use tracing::{debug, warn};

use crate::domain::models::tenant::TenantContext;
use crate::domain::ports::TenantRepository;
use crate::error::AppError;

pub const TENANT_HEADER: &str = "x-tenant-slug";

const RESERVED_SUBDOMAINS: [&str; 4] = ["www", "app", "admin", "api"];

/// `{slug}.{public_domain}` or `{slug}.localhost`, port ignored. Bare and reserved hosts yield `None`.
pub fn parse_subdomain(host: &str, public_domain: &str) -> Option<String> {
    let host = host.trim().to_ascii_lowercase();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host,
    };

    let public_domain = public_domain.trim().trim_start_matches('.').to_ascii_lowercase();
    let prefix = [public_domain.as_str(), "localhost"]
        .iter()
        .filter(|apex| !apex.is_empty())
        .find_map(|apex| host.strip_suffix(&format!(".{}", apex)))?;

    if prefix.contains('.') || RESERVED_SUBDOMAINS.contains(&prefix) || !is_valid_slug(prefix) {
        return None;
    }
    Some(prefix.to_string())
}

pub fn is_valid_slug(slug: &str) -> bool {
    let mut chars = slug.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && slug.len() <= 63
}

/// Slug from the `Host` subdomain, else from `X-Tenant-Slug`. No database access.
pub fn slug_from_headers(headers: &HeaderMap, public_domain: &str) -> Option<String> {
    let from_host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|host| parse_subdomain(host, public_domain));

    from_host.or_else(|| {
        headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    })
}

pub struct TenantResolver {
    repo: Arc<dyn TenantRepository>,
    public_domain: String,
}

impl TenantResolver {
    pub fn new(repo: Arc<dyn TenantRepository>, public_domain: String) -> Self {
        Self { repo, public_domain }
    }

    /// `Ok(None)` only when the request names no tenant at all.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Option<TenantContext>, AppError> {
        match slug_from_headers(headers, &self.public_domain) {
            Some(slug) => self.resolve_slug(&slug).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn resolve_slug(&self, slug: &str) -> Result<TenantContext, AppError> {
        if !is_valid_slug(slug) {
            debug!("Rejected malformed tenant slug");
            return Err(AppError::TenantNotFound);
        }

        let tenant = self.repo.find_by_slug(slug).await?
            .ok_or(AppError::TenantNotFound)?;

        if !tenant.active {
            warn!("Request for disabled tenant {}", tenant.slug);
            return Err(AppError::TenantDisabled);
        }
        Ok(tenant.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_subdomain_on_public_domain() {
        assert_eq!(parse_subdomain("acme.dockpulse.pl", "dockpulse.pl").as_deref(), Some("acme"));
        assert_eq!(parse_subdomain("ACME.DockPulse.pl:443", "dockpulse.pl").as_deref(), Some("acme"));
        assert_eq!(parse_subdomain("beta.localhost:5173", "dockpulse.pl").as_deref(), Some("beta"));
    }

    #[test]
    fn test_parse_subdomain_rejects_bare_reserved_and_nested() {
        assert_eq!(parse_subdomain("dockpulse.pl", "dockpulse.pl"), None);
        assert_eq!(parse_subdomain("localhost:3000", "dockpulse.pl"), None);
        for reserved in ["www", "app", "admin", "api"] {
            assert_eq!(parse_subdomain(&format!("{}.dockpulse.pl", reserved), "dockpulse.pl"), None);
        }
        assert_eq!(parse_subdomain("a.b.dockpulse.pl", "dockpulse.pl"), None);
        assert_eq!(parse_subdomain("acme.example.com", "dockpulse.pl"), None);
        assert_eq!(parse_subdomain("evil-dockpulse.pl", "dockpulse.pl"), None);
    }

    #[test]
    fn test_host_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("acme.dockpulse.pl"));
        headers.insert(TENANT_HEADER, HeaderValue::from_static("beta"));
        assert_eq!(slug_from_headers(&headers, "dockpulse.pl").as_deref(), Some("acme"));

        headers.insert(header::HOST, HeaderValue::from_static("api.dockpulse.pl"));
        assert_eq!(slug_from_headers(&headers, "dockpulse.pl").as_deref(), Some("beta"));

        headers.remove(TENANT_HEADER);
        assert_eq!(slug_from_headers(&headers, "dockpulse.pl"), None);
    }

    #[test]
    fn test_slug_shape() {
        assert!(is_valid_slug("acme"));
        assert!(is_valid_slug("acme-2"));
        assert!(!is_valid_slug("-acme"));
        assert!(!is_valid_slug("acme_co"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug(&"a".repeat(64)));
    }
}
