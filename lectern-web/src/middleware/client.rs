use axum::{extract::ConnectInfo, http::request::Parts, http::HeaderMap};
use std::net::SocketAddr;

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Origin details of a request, captured for rate limiting and auditing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Proxy headers are consulted only when `trust_proxy_headers` is set;
    /// otherwise the socket address is the only source.
    pub fn from_parts(parts: &Parts, trust_proxy_headers: bool) -> Self {
        let socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let forwarded = if trust_proxy_headers {
            forwarded_address(&parts.headers)
        } else {
            None
        };

        Self {
            ip_address: forwarded.or(socket),
            user_agent: header_str(&parts.headers, axum::http::header::USER_AGENT.as_str()).map(str::to_string),
        }
    }

    /// Rate-limit key for unauthenticated traffic
    pub fn rate_limit_key(&self) -> String {
        format!("ip:{}", self.ip_address.as_deref().unwrap_or("unknown"))
    }
}

/// Proxy-reported client address: `CF-Connecting-IP`, then the first
/// `X-Forwarded-For` hop
fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = header_str(headers, CF_CONNECTING_IP) {
        return Some(ip.to_string());
    }

    header_str(headers, X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
