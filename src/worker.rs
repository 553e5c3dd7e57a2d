use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use crate::metrics::{RATE_LIMIT_KEYS, SWEPT_ENTRIES};
use crate::rate_limit::RateLimiter;

// Background sweeper -> drops expired limiter entries between bursts of traffic
pub async fn sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);
    info!(?every, "rate limit sweeper started");

    loop {
        interval.tick().await;
        sweep_once(&limiter);
    }
}

pub fn sweep_once(limiter: &RateLimiter) -> usize {
    let removed = limiter.sweep_expired();
    SWEPT_ENTRIES.inc_by(removed as u64);
    RATE_LIMIT_KEYS.set(limiter.len() as i64);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rate_limit::RateLimitConfig;

    #[test]
    fn sweep_once_updates_store() {
        let clock = ManualClock::default();
        let limiter = RateLimiter::new(Arc::new(clock.clone()), Duration::from_secs(3600));
        limiter.check("a:auth", RateLimitConfig::new(5, 60));
        limiter.check("b:auth", RateLimitConfig::new(5, 60));

        assert_eq!(sweep_once(&limiter), 0);
        clock.advance(Duration::from_secs(61));
        assert_eq!(sweep_once(&limiter), 2);
        assert!(limiter.is_empty());
    }
}
