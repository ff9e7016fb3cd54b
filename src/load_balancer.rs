use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::{Duration, interval};
use tracing::{info, warn};
use crate::config::split_list;
use crate::error::GatewayError;


// Single upstream chat API server

pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

// Round-robin balancer over upstream backends

pub struct LoadBalancer {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl LoadBalancer {
    // Create from comma-separated urls "localhost:8000, localhost:8001"
    pub fn new(backends_str: &str) -> Result<Self, GatewayError> {
        let backends: Vec<Arc<Backend>> = split_list(backends_str)
            .map(|url| {
                // add http:// if no scheme given
                let full_url = if url.starts_with("http://") || url.starts_with("https://") {
                    url.trim_end_matches('/').to_string()
                } else {
                    format!("http://{}", url.trim_end_matches('/'))
                };
                Arc::new(Backend::new(full_url))
            })
            .collect();
        if backends.is_empty() {
            return Err(GatewayError::NoBackends);
        }

        info!(count = backends.len(), "load balancer initialized");
        for (i, b) in backends.iter().enumerate() {
            info!("  [{}]  {}", i + 1, b.url);
        }

        Ok(Self {
            backends,
            current: AtomicUsize::new(0),
        })
    }

    // Get next healthy backend (round-robin)
    pub fn get_backend(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        for i in 0..len {
            let idx = (start + i) % len;
            let backend = &self.backends[idx];

            if backend.is_healthy() {
                return Some(Arc::clone(backend));
            }
        }
        None
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

// Probes every backend on a fixed interval and flips its health flag

pub async fn health_checker(
    load_balancer: Arc<LoadBalancer>,
    client: reqwest::Client,
    check_interval: Duration,
    health_path: String,
) {
    let mut interval = interval(check_interval);

    info!(interval = ?check_interval, path = %health_path, "health checker started");

    loop {
        interval.tick().await;

        for backend in load_balancer.all_backends() {
            let url = format!("{}{}", backend.url, health_path);

            let was_healthy = backend.is_healthy();

            let is_healthy = match client.get(&url).timeout(Duration::from_secs(5)).send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            backend.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    info!(backend = %backend.url, "backend is now healthy");
                } else {
                    warn!(backend = %backend.url, "backend is now unhealthy");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backend_urls() {
        let lb = LoadBalancer::new(" localhost:8000, https://chat.internal/ ,").unwrap();
        let urls: Vec<_> = lb.all_backends().iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, ["http://localhost:8000", "https://chat.internal"]);
    }

    #[test]
    fn empty_backend_list_is_an_error() {
        assert!(matches!(LoadBalancer::new(" , "), Err(GatewayError::NoBackends)));
    }

    #[test]
    fn round_robin_skips_unhealthy_backends() {
        let lb = LoadBalancer::new("a:1,b:2,c:3").unwrap();
        lb.all_backends()[1].set_healthy(false);

        let picked: Vec<_> = (0..4)
            .map(|_| lb.get_backend().unwrap().url.clone())
            .collect();
        assert_eq!(picked, ["http://a:1", "http://c:3", "http://c:3", "http://a:1"]);
    }

    #[test]
    fn no_backend_when_all_unhealthy() {
        let lb = LoadBalancer::new("a:1").unwrap();
        lb.all_backends()[0].set_healthy(false);
        assert!(lb.get_backend().is_none());
    }
}
