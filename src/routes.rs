use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use std::sync::Arc;
use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::middleware::{
    access_hours_middleware, rate_limit_middleware, request_logging, role_check_middleware,
};
use crate::state::AppState;

// Everything not matched below is proxied upstream through the policy stack.
// Layers run outermost first: access hours, roles, rate limit, then the proxy.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .fallback(proxy_handler)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), role_check_middleware))
        .layer(from_fn_with_state(state.clone(), access_hours_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .layer(from_fn(request_logging))
        .with_state(state)
}
