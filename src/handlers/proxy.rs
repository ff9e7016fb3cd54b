use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, header},
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use crate::error::GatewayError;
use crate::metrics::{REQUEST_TOTAL, UPSTREAM_LATENCY};
use crate::state::AppState;

// Headers that only describe a single hop and must not be relayed
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        header::TE,
    ] {
        headers.remove(name);
    }
}

// Only an exceeded limit is a 413; anything else (client went away, bad
// chunking) is reported as a bad request body
async fn read_body(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(GatewayError::PayloadTooLarge),
        Err(e) => Err(GatewayError::BadRequestBody(e.to_string())),
    }
}

// Forwards an admitted request to the next healthy backend
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, GatewayError> {
    REQUEST_TOTAL.inc();

    let backend = state
        .load_balancer
        .get_backend()
        .ok_or(GatewayError::NoHealthyBackend)?;

    let (parts, body) = request.into_parts();
    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{}{}", backend.url, path_and_query);

    let body = read_body(body, state.max_body_bytes).await?;

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    strip_hop_by_hop(&mut headers);

    debug!(backend = %backend.url, method = %parts.method, url = %url, "forwarding");

    let start_time = Instant::now();
    let result = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match result {
        Ok(res) => res,
        // Marking backend as unhealthy on transport error
        Err(e) => {
            backend.set_healthy(false);
            warn!(backend = %backend.url, error = %e, "backend failed, marked unhealthy");
            return Err(GatewayError::Upstream(e));
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = upstream.bytes().await?;

    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
