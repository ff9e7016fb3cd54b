use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;
use crate::metrics::TRACKED_CLIENTS;

// Limiter settings: how many requests fit into the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: usize,
}

impl RateLimitConfig {
    pub fn new(window_seconds: u64, max_requests: usize) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            max_requests,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(60, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    // retry_after: time until the oldest recorded request leaves the window
    Reject { retry_after: Duration },
}

#[cfg(test)]
impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

// Recent request timestamps of one client, in arrival order
#[derive(Debug, Default)]
pub struct ClientWindow {
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    // Drop everything older than `now - window`. Scans the whole sequence so
    // out-of-order arrivals are handled the same way as in-order ones.
    fn prune(&mut self, now: Instant, window: Duration) {
        self.timestamps
            .retain(|&t| now.saturating_duration_since(t) <= window);
    }

    // Time until the oldest entry is pruned, i.e. until `now - oldest > window`
    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        self.timestamps
            .iter()
            .min()
            .map(|&oldest| {
                window.saturating_sub(now.saturating_duration_since(oldest)) + Duration::from_nanos(1)
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

// Sliding-window limiter keyed by client identifier. Prune, decide and append
// for one identifier all run under that entry's shard lock.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, ClientWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    // Prune entries older than `now - window`, then record `now` if there is room
    pub fn admit(&self, identifier: &str, now: Instant) -> Decision {
        let window = self.config.window;

        let mut entry = self.windows.entry(identifier.to_string()).or_default();
        entry.prune(now, window);

        if entry.len() >= self.config.max_requests {
            return Decision::Reject {
                retry_after: entry.retry_after(now, window),
            };
        }

        entry.timestamps.push_back(now);
        Decision::Allow
    }

    pub fn check(&self, identifier: &str) -> Decision {
        self.admit(identifier, Instant::now())
    }

    // Requests from `identifier` still inside the window at `now` (read only)
    pub fn recorded(&self, identifier: &str, now: Instant) -> usize {
        let window = self.config.window;
        self.windows
            .get(identifier)
            .map(|entry| {
                entry
                    .timestamps
                    .iter()
                    .filter(|&&t| now.saturating_duration_since(t) <= window)
                    .count()
            })
            .unwrap_or(0)
    }

    // Prune every window, evict the empty ones, return how many were evicted
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window;
        let before = self.windows.len();
        self.windows.retain(|_, entry| {
            entry.prune(now, window);
            !entry.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    #[cfg(test)]
    pub fn reset(&self) {
        self.windows.clear();
    }
}

// Background eviction of idle clients, keeps the map bounded by active callers
pub async fn window_sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);

    debug!(interval = ?every, "window sweeper started");

    loop {
        interval.tick().await;

        let evicted = limiter.sweep(Instant::now());
        let tracked = limiter.tracked();
        TRACKED_CLIENTS.set(tracked as f64);

        if evicted > 0 {
            debug!(evicted, tracked, "evicted idle rate limit windows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn allows_until_limit_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let base = Instant::now();

        for t in 0..5 {
            assert_eq!(limiter.admit("10.0.0.1", at(base, t)), Decision::Allow);
        }
        let decision = limiter.admit("10.0.0.1", at(base, 5));
        assert!(!decision.is_allowed());
        assert_eq!(limiter.recorded("10.0.0.1", at(base, 5)), 5);
    }

    #[test]
    fn oldest_entry_expires_after_window() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let base = Instant::now();

        for t in 0..5 {
            limiter.admit("10.0.0.1", at(base, t));
        }
        assert!(!limiter.admit("10.0.0.1", at(base, 5)).is_allowed());

        // t=0 is pruned at t=61, leaving 4 entries before the append
        assert_eq!(limiter.admit("10.0.0.1", at(base, 61)), Decision::Allow);
        assert_eq!(limiter.recorded("10.0.0.1", at(base, 61)), 5);
        assert!(!limiter.admit("10.0.0.1", at(base, 61)).is_allowed());
    }

    #[test]
    fn entry_exactly_at_window_edge_is_kept() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 1));
        let base = Instant::now();

        assert!(limiter.admit("a", base).is_allowed());
        assert!(!limiter.admit("a", at(base, 60)).is_allowed());
        assert!(limiter.admit("a", at(base, 61)).is_allowed());
    }

    #[test]
    fn stale_history_resets_count_to_one() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10, 3));
        let base = Instant::now();

        for t in 0..3 {
            limiter.admit("a", at(base, t));
        }
        assert!(limiter.admit("a", at(base, 100)).is_allowed());
        assert_eq!(limiter.recorded("a", at(base, 100)), 1);
    }

    #[test]
    fn burst_at_same_instant_counts_each_request() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 3));
        let now = Instant::now();

        let allowed = (0..10).filter(|_| limiter.admit("burst", now).is_allowed()).count();
        assert_eq!(allowed, 3);
        assert_eq!(limiter.recorded("burst", now), 3);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 1));
        let now = Instant::now();

        assert!(limiter.admit("a", now).is_allowed());
        assert!(limiter.admit("b", now).is_allowed());
        assert!(!limiter.admit("a", now).is_allowed());
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 0));
        assert!(!limiter.check("a").is_allowed());
        assert_eq!(limiter.recorded("a", Instant::now()), 0);
    }

    #[test]
    fn rejection_reports_time_until_slot_frees() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 2));
        let base = Instant::now();

        limiter.admit("a", base);
        limiter.admit("a", at(base, 20));
        let decision = limiter.admit("a", at(base, 25));
        let Decision::Reject { retry_after } = decision else {
            panic!("expected reject, got {decision:?}");
        };
        assert_eq!(retry_after, Duration::from_secs(35) + Duration::from_nanos(1));

        // waiting exactly that long frees the slot
        assert_eq!(limiter.admit("a", at(base, 25) + retry_after), Decision::Allow);
    }

    #[test]
    fn now_before_recorded_timestamps_does_not_panic() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 2));
        let base = Instant::now();

        assert!(limiter.admit("a", at(base, 100)).is_allowed());
        assert!(limiter.admit("a", at(base, 50)).is_allowed());
        assert!(!limiter.admit("a", base).is_allowed());

        // t=50 is out of order behind t=100 but still pruned at t=111
        assert!(limiter.admit("a", at(base, 111)).is_allowed());
        assert_eq!(limiter.recorded("a", at(base, 111)), 2);
    }

    #[test]
    fn sweep_evicts_idle_clients_only() {
        let limiter = RateLimiter::new(RateLimitConfig::new(60, 5));
        let base = Instant::now();

        limiter.admit("idle", base);
        limiter.admit("active", at(base, 50));

        assert_eq!(limiter.sweep(at(base, 70)), 1);
        assert_eq!(limiter.tracked(), 1);
        assert_eq!(limiter.recorded("active", at(base, 70)), 1);

        limiter.reset();
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn concurrent_callers_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(60, 10)));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..20).filter(|_| limiter.admit("shared", now).is_allowed()).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 10);
    }
}
