mod access_hours;
mod client;
mod logging;
mod rate_limit;
mod roles;

pub use access_hours::{AccessHours, access_hours_middleware};
pub use logging::request_logging;
pub use rate_limit::rate_limit_middleware;
pub use roles::{RolePolicy, role_check_middleware};
