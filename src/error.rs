use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Rate limit exceeded. Try again later.")]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    AccessRestricted(String),

    #[error("Your role is not allowed to access this resource")]
    RoleForbidden,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Failed to read request body: {0}")]
    BadRequestBody(String),

    #[error("No healthy backends available")]
    NoHealthyBackend,

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("At least one backend required")]
    NoBackends,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::AccessRestricted(_) | GatewayError::RoleForbidden => StatusCode::FORBIDDEN,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BadRequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Metrics(_) | GatewayError::NoBackends => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Whole seconds, rounded up, never below one
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();

        if let GatewayError::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}
