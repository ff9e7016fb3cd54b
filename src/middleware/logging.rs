use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;
use super::client::client_identifier;

const USER: &str = "x-user";

pub async fn request_logging(request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(USER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("Anonymous")
        .to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(request.headers(), peer);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    info!(user = %user, client = %client, method = %method, path = %path, "request");

    let start = Instant::now();
    let response = next.run(request).await;

    info!(
        user = %user,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "response"
    );

    response
}
