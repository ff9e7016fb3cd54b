use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tracing::info;
use crate::config::split_list;
use crate::error::GatewayError;
use crate::metrics::ACCESS_DENIED;
use crate::state::AppState;

const USER_ROLE: &str = "x-user-role";

// Which paths need a privileged role, and which roles qualify
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    protected_prefixes: Vec<String>,
    allowed_roles: Vec<String>,
}

// Percent-decode, drop empty and "." segments, resolve "..", so that
// "/%61dmin//users/../x" and "/admin/x" compare equal
fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

impl RolePolicy {
    pub fn new(protected_prefixes: &str, allowed_roles: &str) -> Self {
        Self {
            protected_prefixes: split_list(protected_prefixes).map(normalize_path).collect(),
            allowed_roles: split_list(allowed_roles).map(str::to_lowercase).collect(),
        }
    }

    // Prefixes match whole segments: "/admin" covers "/admin/users", not "/administrator"
    pub fn is_protected(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.protected_prefixes.iter().any(|prefix| {
            prefix == "/"
                || path == *prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn permits(&self, path: &str, role: Option<&str>) -> bool {
        if !self.is_protected(path) {
            return true;
        }
        role.map(|r| r.trim().to_lowercase())
            .is_some_and(|r| self.allowed_roles.contains(&r))
    }
}

pub async fn role_check_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let role = request.headers().get(USER_ROLE).and_then(|v| v.to_str().ok());
    let path = request.uri().path();

    if !state.role_policy.permits(path, role) {
        ACCESS_DENIED.inc();
        info!(path = %path, role = role.unwrap_or("-"), "role not permitted");
        return GatewayError::RoleForbidden.into_response();
    }

    next.run(request).await
}
