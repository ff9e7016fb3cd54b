use chrono::NaiveTime;
use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway")]
#[command(about = "Rate limiting gateway in front of a chat API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Upstream chat API servers (comma-separated)
    // Example: "localhost:8000,localhost:8001"
    #[arg(short, long, default_value = "localhost:8000")]
    pub backends: String,

    // Rate limit max requests per window, per client
    #[arg(long, default_value_t = 5)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // HTTP methods that count against the rate limit (comma-separated)
    #[arg(long, default_value = "POST")]
    pub limited_methods: String,

    // How often idle client windows are evicted, in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Health check interval
    #[arg(long, default_value_t = 30)]
    pub health_interval: u64,

    // Path probed on every backend by the health checker
    #[arg(long, default_value = "/api/")]
    pub health_path: String,

    // Start of the daily access window (local time, HH:MM)
    #[arg(long, default_value = "06:00", value_parser = parse_time)]
    pub access_start: NaiveTime,

    // End of the daily access window (local time, HH:MM)
    #[arg(long, default_value = "21:00", value_parser = parse_time)]
    pub access_end: NaiveTime,

    // Serve around the clock
    #[arg(long)]
    pub no_access_hours: bool,

    // Path prefixes that require a privileged role (comma-separated)
    #[arg(long, default_value = "/admin")]
    pub admin_paths: String,

    // Roles allowed on admin paths (comma-separated)
    #[arg(long, default_value = "admin,moderator")]
    pub allowed_roles: String,

    // Largest request body forwarded upstream
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

// Split a comma-separated flag into trimmed, non-empty items
pub fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_messaging_policy() {
        let args = Args::parse_from(["chat-gateway"]);
        assert_eq!(args.rate_limit, 5);
        assert_eq!(args.rate_window, 60);
        assert_eq!(args.access_start, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(args.access_end, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
        assert!(!args.no_access_hours);
    }

    #[test]
    fn rejects_malformed_access_time() {
        assert!(Args::try_parse_from(["chat-gateway", "--access-start", "6am"]).is_err());
    }

    #[test]
    fn split_list_skips_blanks() {
        let items: Vec<_> = split_list(" admin, ,moderator ,").collect();
        assert_eq!(items, ["admin", "moderator"]);
    }
}
