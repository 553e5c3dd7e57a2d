use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::rate_limit::RateLimitResult;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Too many requests")]
    RateLimited {
        limit: u32,
        decision: RateLimitResult,
    },

    #[error("No healthy upstreams available")]
    NoHealthyUpstream,

    #[error("At least one upstream is required")]
    NoUpstreams,

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::RateLimited { limit, decision } => {
                return rate_limited_response(*limit, decision);
            }
            GatewayError::NoHealthyUpstream => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::NoUpstreams | GatewayError::Metrics(_) | GatewayError::Io(_) => {
                tracing::error!("{self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
            retry_after: None,
        };
        (status, Json(body)).into_response()
    }
}

// JSON body of every error response; retryAfter only on 429
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

fn rate_limited_response(limit: u32, decision: &RateLimitResult) -> Response {
    let retry_after = decision.reset_in.to_string();
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("retry-after", retry_after.clone()),
            ("x-ratelimit-limit", limit.to_string()),
            ("x-ratelimit-remaining", decision.remaining.to_string()),
            ("x-ratelimit-reset", retry_after),
        ],
        Json(ErrorBody {
            error: "Too many requests".to_string(),
            retry_after: Some(decision.reset_in),
        }),
    )
        .into_response()
}
