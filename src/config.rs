use clap::Parser;
use std::time::Duration;

use crate::admission::RateLimitPresets;
use crate::rate_limit::RateLimitConfig;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "crewgate")]
#[command(about = "Rate limiting gateway for the crew recruitment marketplace")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Marketplace instances (comma-separated)
    // Example: "localhost:3000,localhost:3001"
    #[arg(short, long, default_value = "localhost:3000")]
    pub upstreams: String,

    // Path probed on each upstream by the health checker
    #[arg(long, default_value = "/api/health")]
    pub health_path: String,

    // Health check interval in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_interval: u64,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub auth_limit: u32,

    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub email_limit: u32,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub upload_limit: u32,

    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub api_limit: u32,

    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub public_limit: u32,

    // Rate limit window in seconds, shared by every preset
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // Seconds between sweeps of expired limiter entries
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub cleanup_interval: u64,

    // Largest request body forwarded upstream
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,
}

impl Args {
    pub fn presets(&self) -> RateLimitPresets {
        let window = self.rate_window;
        RateLimitPresets {
            auth: RateLimitConfig::new(self.auth_limit, window),
            email: RateLimitConfig::new(self.email_limit, window),
            upload: RateLimitConfig::new(self.upload_limit, window),
            api: RateLimitConfig::new(self.api_limit, window),
            public: RateLimitConfig::new(self.public_limit, window),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_presets() {
        let args = Args::parse_from(["crewgate"]);
        assert_eq!(args.presets(), RateLimitPresets::default());
        assert_eq!(args.cleanup_interval(), Duration::from_secs(60));
    }

    #[test]
    fn flags_override_presets() {
        let args = Args::parse_from([
            "crewgate",
            "--auth-limit",
            "2",
            "--rate-window",
            "30",
            "-u",
            "app-1:3000,app-2:3000",
        ]);
        let presets = args.presets();
        assert_eq!(presets.auth, RateLimitConfig::new(2, 30));
        assert_eq!(presets.public, RateLimitConfig::new(30, 30));
        assert_eq!(args.upstreams, "app-1:3000,app-2:3000");
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(Args::try_parse_from(["crewgate", "--email-limit", "0"]).is_err());
        assert!(Args::try_parse_from(["crewgate", "--rate-window", "0"]).is_err());
    }
}
