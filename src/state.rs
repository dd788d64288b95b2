use std::sync::Arc;

use crate::auth::token::TokenService;
use crate::config::{AppConfig, RateLimitConfig, SecurityConfig};
use crate::rate_limit::{MemoryRateLimiter, RateLimit};
use crate::store::{session::SessionRegistry, MemoryUserStore, UserStore};

/// Everything the gateway handlers need, constructed once per process (or
/// per test) and handed around by clone. No ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionRegistry>,
    pub limiter: Arc<dyn RateLimit>,
    pub tokens: TokenService,
}

impl AppState {
    /// Memory-backed state, the reference deployment.
    pub fn new(config: AppConfig) -> Self {
        let tokens = TokenService::new(&config.security.jwt_secret);
        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::new()),
            sessions: Arc::new(SessionRegistry::new()),
            limiter: Arc::new(MemoryRateLimiter::new()),
            tokens,
        }
    }

    /// Swap in alternative store or limiter implementations.
    pub fn with_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<SessionRegistry>,
        limiter: Arc<dyn RateLimit>,
    ) -> Self {
        let tokens = TokenService::new(&config.security.jwt_secret);
        Self {
            config: Arc::new(config),
            users,
            sessions,
            limiter,
            tokens,
        }
    }

    /// State for tests: fixed secret, fast hashing, reference rate limits.
    pub fn fake() -> Self {
        Self::new(AppConfig {
            environment: "test".into(),
            security: SecurityConfig {
                jwt_secret: "test-secret".into(),
                session_ttl_days: 7,
                hash_memory_kib: 8,
                hash_iterations: 1,
            },
            rate_limit: RateLimitConfig {
                window_secs: 900,
                max_general: 100,
                max_auth: 5,
            },
            expose_verification_code: true,
            protect_stats: false,
        })
    }
}
