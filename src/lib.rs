pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod load_balancer;
pub mod metrics;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod worker;

pub use admission::{RateLimitPreset, RateLimitPresets, admit, client_identifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GatewayError;
pub use rate_limit::{RateLimitConfig, RateLimitEntry, RateLimitResult, RateLimiter};
pub use routes::router;
pub use state::AppState;
