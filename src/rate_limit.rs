use axum::async_trait;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

/// Named throttling policy. Two policies exist in the reference deployment:
/// `general` for all traffic and `auth` for register/login.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected { retry_after: Duration },
}

/// Request throttling capability keyed by client identity. The in-memory
/// limiter is the reference; a shared-cache limiter can be swapped in without
/// changing the gateway contract.
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn allow(&self, key: &str, policy: &RatePolicy) -> Decision;
}

#[derive(Debug)]
struct Window {
    started_at: OffsetDateTime,
    count: u32,
}

/// Fixed-window counter per (client key, policy). The window resets on time
/// alone: once `policy.window` has elapsed since the window started, the
/// count restarts from zero regardless of how full the old window was.
#[derive(Default)]
pub struct MemoryRateLimiter {
    windows: RwLock<HashMap<(String, &'static str), Window>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn allow_at(&self, key: &str, policy: &RatePolicy, now: OffsetDateTime) -> Decision {
        let mut windows = self.windows.write().await;
        let window = windows
            .entry((key.to_string(), policy.name))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now - window.started_at >= policy.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count < policy.max_requests {
            window.count += 1;
            Decision::Allowed
        } else {
            let retry_after = (window.started_at + policy.window) - now;
            Decision::Rejected { retry_after }
        }
    }
}

#[async_trait]
impl RateLimit for MemoryRateLimiter {
    async fn allow(&self, key: &str, policy: &RatePolicy) -> Decision {
        self.allow_at(key, policy, OffsetDateTime::now_utc()).await
    }
}
