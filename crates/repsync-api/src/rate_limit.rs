use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::auth::user_fingerprint;
use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window request limiter keyed by endpoint and user.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    push_limit: u32,
    pull_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Clone, Copy)]
pub enum ProtectedEndpoint {
    Push,
    Pull,
}

#[derive(Default)]
struct RateLimitMetrics {
    push_allowed: AtomicU64,
    push_limited: AtomicU64,
    pull_allowed: AtomicU64,
    pull_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub push_allowed: u64,
    pub push_limited: u64,
    pub pull_allowed: u64,
    pub pull_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.push_rate_limit_per_window,
            config.pull_rate_limit_per_window,
        )
    }

    pub fn new(window: Duration, push_limit: u32, pull_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            push_limit,
            pull_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, user_id: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::Push => self.push_limit,
            ProtectedEndpoint::Pull => self.pull_limit,
        };

        let key = format!("{}:{user_id}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.counters(endpoint).1.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                endpoint = endpoint.label(),
                user = user_fingerprint(user_id),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                format!("Rate limit exceeded for {}", endpoint.label()),
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.counters(endpoint).0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            push_allowed: self.metrics.push_allowed.load(Ordering::Relaxed),
            push_limited: self.metrics.push_limited.load(Ordering::Relaxed),
            pull_allowed: self.metrics.pull_allowed.load(Ordering::Relaxed),
            pull_limited: self.metrics.pull_limited.load(Ordering::Relaxed),
        }
    }

    /// (allowed, limited) counters for an endpoint
    fn counters(&self, endpoint: ProtectedEndpoint) -> (&AtomicU64, &AtomicU64) {
        match endpoint {
            ProtectedEndpoint::Push => (&self.metrics.push_allowed, &self.metrics.push_limited),
            ProtectedEndpoint::Pull => (&self.metrics.pull_allowed, &self.metrics.pull_limited),
        }
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Push => "sync_push",
            Self::Pull => "sync_pull",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 2, 2);

        limiter.check(ProtectedEndpoint::Push, "user-a").await.unwrap();
        limiter.check(ProtectedEndpoint::Push, "user-a").await.unwrap();

        let err = limiter
            .check(ProtectedEndpoint::Push, "user-a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, _)));

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.push_allowed, 2);
        assert_eq!(metrics.push_limited, 1);
    }

    #[tokio::test]
    async fn limits_are_per_endpoint_and_user() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 1, 1);

        limiter.check(ProtectedEndpoint::Push, "user-a").await.unwrap();
        limiter.check(ProtectedEndpoint::Pull, "user-a").await.unwrap();
        limiter.check(ProtectedEndpoint::Push, "user-b").await.unwrap();

        assert!(limiter.check(ProtectedEndpoint::Pull, "user-a").await.is_err());
        assert_eq!(limiter.metrics_snapshot().pull_limited, 1);
    }
}
