use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Uri, header},
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::metrics::{UPSTREAM_ERRORS, UPSTREAM_LATENCY};
use crate::state::AppState;

// headers that describe this hop only; content-length is recomputed from the body
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in [
        header::CONNECTION,
        header::HOST,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        header::TE,
        header::TRAILER,
        header::PROXY_AUTHORIZATION,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

// Fallback handler: relay an admitted request to the next healthy marketplace instance.
// An oversized body is rejected with 413 by the Bytes extractor before we get here.
pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    mut headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let upstream = state
        .load_balancer
        .next_upstream()
        .ok_or(GatewayError::NoHealthyUpstream)?;

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream.url, path);

    strip_hop_by_hop(&mut headers);

    debug!(%method, %url, "forwarding request");
    let start_time = Instant::now();

    let result = state
        .client
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream_res = match result {
        Ok(res) => res,
        // marking upstream as unhealthy until the health checker sees it again
        Err(e) => {
            UPSTREAM_ERRORS.inc();
            upstream.set_healthy(false);
            warn!(upstream = %upstream.url, error = %e, "upstream failed, marked unhealthy");
            return Err(e.into());
        }
    };

    let status = upstream_res.status();
    let mut res_headers = upstream_res.headers().clone();
    strip_hop_by_hop(&mut res_headers);
    let bytes = upstream_res.bytes().await?;

    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = res_headers;
    Ok(response)
}
