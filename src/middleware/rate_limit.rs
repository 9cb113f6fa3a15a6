// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client rate limiting.

use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request},
    response::IntoResponse,
};
use governor::middleware::NoOpMiddleware;
use std::net::SocketAddr;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorError, GovernorLayer,
};

/// Proxy headers checked for the client address, most trusted first.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "X-Forwarded-For",
    "X-Real-IP",
    "CF-Connecting-IP",
    "True-Client-IP",
];

/// Keys requests by client IP, looking through common proxy headers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;

    fn extract<B>(&self, req: &Request<B>) -> Result<Self::Key, GovernorError> {
        let from_headers = CLIENT_IP_HEADERS.iter().find_map(|name| {
            req.headers()
                .get(*name)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        });

        if let Some(ip) = from_headers {
            return Ok(ip.to_string());
        }
        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return Ok(addr.ip().to_string());
        }
        Ok("unknown".to_string())
    }
}

/// Token bucket per client, refilled at `per_second` requests per second
/// with room for `burst` back-to-back requests.
pub fn rate_limit_layer(
    per_second: u64,
    burst: u32,
) -> anyhow::Result<GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware, axum::body::Body>> {
    let config = GovernorConfigBuilder::default()
        .per_millisecond((1000 / per_second.max(1)).max(1))
        .burst_size(burst.max(1))
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?;

    Ok(GovernorLayer::new(config).error_handler(|err| {
        tracing::debug!(error = ?err, "Rate limit exceeded");
        AppError::RateLimited.into_response()
    }))
}
