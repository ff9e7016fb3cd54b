use axum::http::Method;
use std::sync::Arc;
use crate::load_balancer::LoadBalancer;
use crate::middleware::{AccessHours, RolePolicy};
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub client: reqwest::Client,
    pub load_balancer: Arc<LoadBalancer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub limited_methods: Vec<Method>, // methods that count against the limit
    pub access_hours: Option<AccessHours>, // None = open around the clock
    pub role_policy: RolePolicy,
    pub max_body_bytes: usize,
}
