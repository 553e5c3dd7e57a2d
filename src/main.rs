use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewgate::clock::SystemClock;
use crewgate::config::Args;
use crewgate::load_balancer::{LoadBalancer, health_checker};
use crewgate::worker::sweeper;
use crewgate::{AppState, GatewayError, RateLimiter, router};

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();

    let client = reqwest::Client::new();
    let load_balancer = Arc::new(LoadBalancer::new(&args.upstreams)?);
    // one limiter for the process; its store is not shared with other instances
    let limiter = Arc::new(RateLimiter::new(
        Arc::new(SystemClock),
        args.cleanup_interval(),
    ));

    let state = Arc::new(AppState {
        client: client.clone(),
        load_balancer: Arc::clone(&load_balancer),
        limiter: Arc::clone(&limiter),
        presets: args.presets(),
        max_body_bytes: args.max_body_bytes,
    });

    tokio::spawn(sweeper(limiter, args.cleanup_interval()));
    tokio::spawn(health_checker(
        load_balancer,
        client,
        args.health_path.clone(),
        args.health_interval(),
    ));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}", args.port);
    info!("Forwarding to {}", args.upstreams);
    for preset in crewgate::RateLimitPreset::ALL {
        let config = args.presets().config(preset);
        info!(
            "Rate limit [{}]: {} requests per {} seconds",
            preset.label(),
            config.limit,
            config.window_seconds
        );
    }

    axum::serve(listener, app).await?;
    Ok(())
}
