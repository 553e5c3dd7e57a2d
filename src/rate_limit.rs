use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

// Rate limit entry - tracks requests per client:endpoint key
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: Instant,
}

// `limit` requests per `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitConfig {
    pub const fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: u64, // seconds until the window ends, rounded up
}

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

// Fixed-window counter keyed by `client:endpoint`.
// State is per process: N gateway instances enforce N times the quota.
#[derive(Debug)]
pub struct RateLimiter {
    store: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    cleanup_interval: Duration,
    last_cleanup: Mutex<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_CLEANUP_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, cleanup_interval: Duration) -> Self {
        let now = clock.now();
        Self {
            store: DashMap::new(),
            clock,
            cleanup_interval,
            last_cleanup: Mutex::new(now),
        }
    }

    // limit and window_seconds must be positive; not checked here
    pub fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now();
        self.maybe_cleanup(now);

        // the entry guard holds the shard lock, so read-increment-compare is atomic per key
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_time: now,
            });

        // new key or window expired..? start a fresh one
        if entry.count == 0 || now >= entry.reset_time {
            *entry = RateLimitEntry {
                count: 1,
                reset_time: now + config.window(),
            };
            return RateLimitResult {
                allowed: true,
                remaining: config.limit.saturating_sub(1),
                reset_in: config.window_seconds,
            };
        }

        entry.count = entry.count.saturating_add(1);
        let reset_in = seconds_until(now, entry.reset_time);

        if entry.count > config.limit {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }

        RateLimitResult {
            allowed: true,
            remaining: config.limit - entry.count,
            reset_in,
        }
    }

    // returns how many entries were removed
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.store.len();
        self.store.retain(|_, entry| now < entry.reset_time);
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "swept expired rate limit entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // Sweep at most once per cleanup interval. Callers that lose the race skip it.
    fn maybe_cleanup(&self, now: Instant) {
        let Ok(mut last) = self.last_cleanup.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) < self.cleanup_interval {
            return;
        }
        *last = now;
        drop(last);
        self.sweep_expired();
    }
}

fn seconds_until(now: Instant, deadline: Instant) -> u64 {
    let millis = deadline.saturating_duration_since(now).as_millis();
    millis.div_ceil(1000) as u64
}
