use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use crate::error::GatewayError;
use crate::metrics::{RATE_LIMIT_ALLOWED, RATE_LIMIT_REJECTED, TRACKED_CLIENTS};
use crate::rate_limit::Decision;
use crate::state::AppState;
use super::client::client_identifier;

// Short-circuits with 429 once a client used up its window
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.limited_methods.contains(request.method()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(request.headers(), peer);

    let decision = state.rate_limiter.check(&client);
    TRACKED_CLIENTS.set(state.rate_limiter.tracked() as f64);

    match decision {
        Decision::Allow => {
            RATE_LIMIT_ALLOWED.inc();
            debug!(
                client = %client,
                used = state.rate_limiter.recorded(&client, Instant::now()),
                "rate limit: allowed"
            );
            next.run(request).await
        }
        Decision::Reject { retry_after } => {
            RATE_LIMIT_REJECTED.inc();
            warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
            GatewayError::RateLimited { retry_after }.into_response()
        }
    }
}
