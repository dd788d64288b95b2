use crate::rate_limit::RatePolicy;
use serde::Deserialize;
use time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub session_ttl_days: i64,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: i64,
    pub max_general: u32,
    pub max_auth: u32,
}

impl RateLimitConfig {
    pub fn general(&self) -> RatePolicy {
        RatePolicy {
            name: "general",
            window: Duration::seconds(self.window_secs),
            max_requests: self.max_general,
        }
    }

    pub fn auth(&self) -> RatePolicy {
        RatePolicy {
            name: "auth",
            window: Duration::seconds(self.window_secs),
            max_requests: self.max_auth,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    /// Return the email verification code in the register response. Delivery
    /// is an external concern; exposing the code is a development convenience
    /// and defaults off in production.
    pub expose_verification_code: bool,
    /// Require a valid bearer token on GET /stats. Off by default to match
    /// the reference behavior.
    pub protect_stats: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let security = SecurityConfig {
            jwt_secret: std::env::var("JWT_SECRET")?,
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
            hash_memory_kib: std::env::var("HASH_MEMORY_KIB")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(19_456),
            hash_iterations: std::env::var("HASH_ITERATIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(2),
        };
        let rate_limit = RateLimitConfig {
            window_secs: std::env::var("RATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(900),
            max_general: std::env::var("RATE_MAX_GENERAL")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(100),
            max_auth: std::env::var("RATE_MAX_AUTH")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(5),
        };
        let expose_verification_code = std::env::var("EXPOSE_VERIFICATION_CODE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(environment != "production");
        let protect_stats = std::env::var("STATS_REQUIRE_AUTH")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Ok(Self {
            environment,
            security,
            rate_limit,
            expose_verification_code,
            protect_stats,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::days(self.security.session_ttl_days)
    }
}
