use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveTime, Timelike};
use std::sync::Arc;
use tracing::info;
use crate::error::GatewayError;
use crate::metrics::ACCESS_DENIED;
use crate::state::AppState;

// Daily window during which the API is reachable, both ends inclusive.
// start > end wraps past midnight (22:00-02:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl AccessHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_open(&self, now: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= now && now <= self.end
        } else {
            now >= self.start || now <= self.end
        }
    }

    // Human readable refusal, phrased as the closed period
    pub fn closed_message(&self) -> String {
        format!(
            "Access to messaging is restricted between {} and {}.",
            twelve_hour(self.end),
            twelve_hour(self.start)
        )
    }
}

fn twelve_hour(t: NaiveTime) -> String {
    let (pm, hour) = t.hour12();
    let suffix = if pm { "PM" } else { "AM" };
    if t.minute() == 0 {
        format!("{hour} {suffix}")
    } else {
        format!("{hour}:{:02} {suffix}", t.minute())
    }
}

pub async fn access_hours_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(hours) = state.access_hours else {
        return next.run(request).await;
    };

    let now = Local::now().time();
    if !hours.is_open(now) {
        ACCESS_DENIED.inc();
        info!(path = %request.uri().path(), time = %now.format("%H:%M"), "outside access hours");
        return GatewayError::AccessRestricted(hours.closed_message()).into_response();
    }

    next.run(request).await
}
