use axum::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod session;

/// Closed set of marketplace roles a user can register as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "ผู้ซื้อ/เช่า")]
    Buyer,
    #[serde(rename = "ผู้ขาย/ให้เช่า")]
    Seller,
    #[serde(rename = "นายหน้า")]
    Agent,
}

impl UserType {
    pub const ALL: [UserType; 3] = [UserType::Buyer, UserType::Seller, UserType::Agent];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ผู้ซื้อ/เช่า" => Some(UserType::Buyer),
            "ผู้ขาย/ให้เช่า" => Some(UserType::Seller),
            "นายหน้า" => Some(UserType::Agent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Buyer => "ผู้ซื้อ/เช่า",
            UserType::Seller => "ผู้ขาย/ให้เช่า",
            UserType::Agent => "นายหน้า",
        }
    }
}

/// User record owned by the credential store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String, // normalized lowercase
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub user_type: UserType,
    pub verified: bool,
    pub profile_complete: bool,
    #[serde(skip_serializing)]
    pub verification_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// Fields needed to create a user. `email` must already be normalized.
#[derive(Debug)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub verification_code: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read-only aggregate over the user list.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub total: usize,
    pub verified: usize,
    pub by_type: HashMap<String, usize>,
}

/// Storage capability for user records. The in-memory implementation is the
/// reference; a persistent backend can be swapped in without touching the
/// gateway handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn touch_login(&self, id: Uuid) -> Result<(), StoreError>;
    async fn stats(&self) -> Result<UserStats, StoreError>;
}

/// Process-local user store. A single write lock serializes creation, which
/// is what enforces email uniqueness under concurrent registrations.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            user_type: new.user_type,
            verified: false,
            profile_complete: false,
            verification_code: new.verification_code,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.clone())
    }

    async fn touch_login(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, StoreError> {
        let users = self.users.read().await;
        let mut by_type: HashMap<String, usize> = UserType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        for user in users.iter() {
            *by_type.entry(user.user_type.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(UserStats {
            total: users.len(),
            verified: users.iter().filter(|u| u.verified).count(),
            by_type,
        })
    }
}
