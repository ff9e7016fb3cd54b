mod config;
mod error;
mod handlers;
mod load_balancer;
mod metrics;
mod middleware;
mod rate_limit;
mod routes;
mod state;

use anyhow::Context;
use axum::http::Method;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use crate::config::{Args, split_list};
use crate::load_balancer::{LoadBalancer, health_checker};
use crate::middleware::{AccessHours, RolePolicy};
use crate::rate_limit::{RateLimitConfig, RateLimiter, window_sweeper};
use crate::state::AppState;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();

    let limited_methods = split_list(&args.limited_methods)
        .map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --limited-methods")?;

    let load_balancer = Arc::new(
        LoadBalancer::new(&args.backends).map_err(|e| anyhow::anyhow!("invalid --backends: {e}"))?,
    );
    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
        args.rate_window,
        args.rate_limit,
    )));
    let access_hours = (!args.no_access_hours)
        .then(|| AccessHours::new(args.access_start, args.access_end));

    // creating shared state
    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        load_balancer: load_balancer.clone(),
        rate_limiter: rate_limiter.clone(),
        limited_methods,
        access_hours,
        role_policy: RolePolicy::new(&args.admin_paths, &args.allowed_roles),
        max_body_bytes: args.max_body_bytes,
    });

    // spawn background tasks
    tokio::spawn(health_checker(
        load_balancer,
        reqwest::Client::new(),
        Duration::from_secs(args.health_interval),
        args.health_path.clone(),
    ));
    tokio::spawn(window_sweeper(
        rate_limiter.clone(),
        Duration::from_secs(args.sweep_interval.max(1)),
    ));

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Gateway running on http://localhost:{}", args.port);
    let limits = rate_limiter.config();
    info!(
        "Rate limit: {} {} requests per {:?} per client",
        limits.max_requests, args.limited_methods, limits.window
    );
    match access_hours {
        Some(hours) => info!("Access hours: {} - {}", hours.start, hours.end),
        None => info!("Access hours: unrestricted"),
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
