use std::{net::SocketAddr, num::NonZeroU32};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::{errors::AppError, AppState};

pub type IpRateLimiter = DefaultKeyedRateLimiter<String>;

pub fn build_limiter(per_minute: u32) -> IpRateLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_minute(per_minute))
}

/// Per-client-IP quota for the auth, payment and generation routes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = extract_client_ip(request.headers(), connect_info.map(|ConnectInfo(addr)| addr));

    if state.limiter.check_key(&client_ip).is_err() {
        warn!("Rate limit exceeded for IP: {}", client_ip);
        return Err(AppError::TooManyRequests(
            "Too many requests, slow down".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

pub fn extract_client_ip(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    // Check for common proxy headers
    if let Some(forwarded_for) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return first_ip.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            return real_ip_str.trim().to_string();
        }
    }

    if let Some(forwarded) = headers.get("Forwarded") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // RFC 7239: for=<ip>;proto=...
            for pair in forwarded_str.split(';') {
                if let Some((key, value)) = pair.split_once('=') {
                    if key.trim().eq_ignore_ascii_case("for") {
                        return value.trim().trim_matches('"').to_string();
                    }
                }
            }
        }
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
