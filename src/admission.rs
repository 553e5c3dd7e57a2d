use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::GatewayError;
use crate::metrics::{RATE_LIMIT_KEYS, RATE_LIMITED_TOTAL, REQUESTS_TOTAL};
use crate::rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
use crate::state::AppState;

const FALLBACK_CLIENT: &str = "127.0.0.1";

// Quota classes for the marketplace endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitPreset {
    Auth,
    Email,
    Upload,
    Api,
    Public,
}

impl RateLimitPreset {
    pub const ALL: [RateLimitPreset; 5] = [
        RateLimitPreset::Auth,
        RateLimitPreset::Email,
        RateLimitPreset::Upload,
        RateLimitPreset::Api,
        RateLimitPreset::Public,
    ];

    // second half of the limiter key
    pub fn label(self) -> &'static str {
        match self {
            RateLimitPreset::Auth => "auth",
            RateLimitPreset::Email => "email",
            RateLimitPreset::Upload => "upload",
            RateLimitPreset::Api => "api",
            RateLimitPreset::Public => "public",
        }
    }

    pub fn default_config(self) -> RateLimitConfig {
        match self {
            RateLimitPreset::Auth => RateLimitConfig::new(5, 60),
            RateLimitPreset::Email => RateLimitConfig::new(3, 60),
            RateLimitPreset::Upload => RateLimitConfig::new(10, 60),
            RateLimitPreset::Api => RateLimitConfig::new(60, 60),
            RateLimitPreset::Public => RateLimitConfig::new(30, 60),
        }
    }

    // None for the gateway's own endpoints
    pub fn for_path(path: &str) -> Option<RateLimitPreset> {
        if path == "/health" || path == "/metrics" {
            return None;
        }

        let preset = if under(path, "/api/auth") {
            RateLimitPreset::Auth
        } else if under(path, "/api/email") || under(path, "/api/contact") {
            RateLimitPreset::Email
        } else if under(path, "/api/upload") || under(path, "/api/documents") {
            RateLimitPreset::Upload
        } else if under(path, "/api") {
            RateLimitPreset::Api
        } else {
            RateLimitPreset::Public
        };
        Some(preset)
    }
}

// prefix match on whole segments: /api/authx is not under /api/auth
fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPresets {
    pub auth: RateLimitConfig,
    pub email: RateLimitConfig,
    pub upload: RateLimitConfig,
    pub api: RateLimitConfig,
    pub public: RateLimitConfig,
}

impl Default for RateLimitPresets {
    fn default() -> Self {
        Self {
            auth: RateLimitPreset::Auth.default_config(),
            email: RateLimitPreset::Email.default_config(),
            upload: RateLimitPreset::Upload.default_config(),
            api: RateLimitPreset::Api.default_config(),
            public: RateLimitPreset::Public.default_config(),
        }
    }
}

impl RateLimitPresets {
    pub fn config(&self, preset: RateLimitPreset) -> RateLimitConfig {
        match preset {
            RateLimitPreset::Auth => self.auth,
            RateLimitPreset::Email => self.email,
            RateLimitPreset::Upload => self.upload,
            RateLimitPreset::Api => self.api,
            RateLimitPreset::Public => self.public,
        }
    }
}

// first X-Forwarded-For hop, then X-Real-IP, then loopback
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header("x-real-ip").unwrap_or(FALLBACK_CLIENT).to_string()
}

pub fn rate_limit_key(client: &str, endpoint: &str) -> String {
    format!("{client}:{endpoint}")
}

pub fn admit(
    limiter: &RateLimiter,
    headers: &HeaderMap,
    endpoint: &str,
    config: RateLimitConfig,
) -> Result<RateLimitResult, GatewayError> {
    let key = rate_limit_key(&client_identifier(headers), endpoint);
    let decision = limiter.check(&key, config);
    if decision.allowed {
        Ok(decision)
    } else {
        warn!(%key, limit = config.limit, reset_in = decision.reset_in, "rate limit exceeded");
        Err(GatewayError::RateLimited {
            limit: config.limit,
            decision,
        })
    }
}

pub fn apply_rate_limit_headers(
    headers: &mut HeaderMap,
    config: RateLimitConfig,
    decision: &RateLimitResult,
) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(config.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_in));
}

// Middleware: classify the path, admit or reject, then tag the response
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let Some(preset) = RateLimitPreset::for_path(req.uri().path()) else {
        return Ok(next.run(req).await);
    };

    let endpoint = preset.label();
    REQUESTS_TOTAL.with_label_values(&[endpoint]).inc();

    let config = state.presets.config(preset);
    let admitted = admit(&state.limiter, req.headers(), endpoint, config);
    RATE_LIMIT_KEYS.set(state.limiter.len() as i64);

    let decision = admitted.inspect_err(|_| {
        RATE_LIMITED_TOTAL.with_label_values(&[endpoint]).inc();
    })?;

    let mut response = next.run(req).await;
    apply_rate_limit_headers(response.headers_mut(), config, &decision);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_identifier(&h), "203.0.113.7");
    }

    #[test]
    fn real_ip_used_without_forwarded_for() {
        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_identifier(&h), "198.51.100.2");

        let blank = headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_identifier(&blank), "198.51.100.2");
    }

    #[test]
    fn loopback_when_no_headers() {
        assert_eq!(client_identifier(&HeaderMap::new()), "127.0.0.1");
    }

    #[test]
    fn paths_map_to_presets() {
        assert_eq!(RateLimitPreset::for_path("/health"), None);
        assert_eq!(RateLimitPreset::for_path("/metrics"), None);
        assert_eq!(
            RateLimitPreset::for_path("/api/auth/login"),
            Some(RateLimitPreset::Auth)
        );
        assert_eq!(
            RateLimitPreset::for_path("/api/email/verify"),
            Some(RateLimitPreset::Email)
        );
        assert_eq!(
            RateLimitPreset::for_path("/api/contact"),
            Some(RateLimitPreset::Email)
        );
        assert_eq!(
            RateLimitPreset::for_path("/api/documents/42/versions"),
            Some(RateLimitPreset::Upload)
        );
        assert_eq!(
            RateLimitPreset::for_path("/api/authorities"),
            Some(RateLimitPreset::Api)
        );
        assert_eq!(
            RateLimitPreset::for_path("/jobs/deckhand"),
            Some(RateLimitPreset::Public)
        );
    }

    #[test]
    fn admit_denies_after_quota() {
        let limiter = RateLimiter::default();
        let h = headers(&[("x-forwarded-for", "1.2.3.4")]);
        let config = RateLimitPreset::Email.default_config();

        for remaining in (0..3).rev() {
            let decision = admit(&limiter, &h, "email", config).unwrap();
            assert_eq!(decision.remaining, remaining);
        }
        match admit(&limiter, &h, "email", config) {
            Err(GatewayError::RateLimited { limit, decision }) => {
                assert_eq!(limit, 3);
                assert_eq!(decision.remaining, 0);
                assert!(decision.reset_in <= 60);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn presets_are_overridable() {
        let presets = RateLimitPresets {
            auth: RateLimitConfig::new(2, 30),
            ..RateLimitPresets::default()
        };
        assert_eq!(presets.config(RateLimitPreset::Auth).limit, 2);
        assert_eq!(presets.config(RateLimitPreset::Public).limit, 30);
    }
}
