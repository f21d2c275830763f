use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use uuid::Uuid;
use crate::domain::models::audit::AuditContext;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Requester IP and user agent, as recorded on audit events.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            ip: client_ip(&parts.headers, peer_ip(&parts.extensions)),
            user_agent: parts.headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }

    pub fn audit_context(&self, principal_id: Option<Uuid>) -> AuditContext {
        AuditContext {
            principal_id,
            ip_address: self.ip.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_parts(parts))
    }
}

/// Socket peer, present when the server runs with connect info.
pub fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip())
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<String> {
    header_str(headers, FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .or_else(|| header_str(headers, REAL_IP))
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}

/// Address used for throttling. Forwarding headers are written by the
/// client unless a proxy we control rewrites them, so they only count when
/// `trust_proxy` is set, and then only the hop that proxy appended.
pub fn throttle_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> Option<String> {
    if !trust_proxy {
        return peer.map(|ip| ip.to_string());
    }
    header_str(headers, FORWARDED_FOR)
        .and_then(|chain| chain.rsplit(',').next())
        .map(str::trim)
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
