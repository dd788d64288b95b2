use std::collections::HashMap;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Revocable record binding a token to a user and an expiry. The token itself
/// carries no expiry; this record is the authority.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("session expired")]
    Expired,
}

/// Tracks issued tokens. One record per token; a user may hold several
/// concurrent sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, user_id: Uuid, token: &str, ttl: Duration) -> Session {
        self.open_at(user_id, token, ttl, OffsetDateTime::now_utc())
            .await
    }

    pub async fn open_at(
        &self,
        user_id: Uuid,
        token: &str,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Session {
        let session = Session {
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(token.to_string(), session.clone());
        session
    }

    /// Idempotent; closing an unknown token is a no-op.
    pub async fn close(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token);
    }

    pub async fn lookup(&self, token: &str) -> Result<Session, SessionError> {
        self.lookup_at(token, OffsetDateTime::now_utc()).await
    }

    /// A session is expired strictly after `expires_at`; at the boundary it is
    /// still valid. Expired records are purged on lookup.
    pub async fn lookup_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get(token).ok_or(SessionError::NotFound)?;
        if now > session.expires_at {
            sessions.remove(token);
            return Err(SessionError::Expired);
        }
        Ok(session.clone())
    }

    pub async fn count_active(&self) -> usize {
        self.count_active_at(OffsetDateTime::now_utc()).await
    }

    pub async fn count_active_at(&self, now: OffsetDateTime) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.expires_at > now).count()
    }
}
