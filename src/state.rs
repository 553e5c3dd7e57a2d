use std::sync::Arc;

use crate::admission::RateLimitPresets;
use crate::load_balancer::LoadBalancer;
use crate::rate_limit::RateLimiter;

// app's shared state
#[derive(Debug)]
pub struct AppState {
    pub client: reqwest::Client,
    pub load_balancer: Arc<LoadBalancer>,
    pub limiter: Arc<RateLimiter>,
    pub presets: RateLimitPresets, // quota per endpoint class
    pub max_body_bytes: usize,     // largest body forwarded upstream
}
