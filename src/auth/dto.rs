use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{User, UserType};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^0\d{8,9}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub user_type: String,
}

/// Registration input that passed validation, with the email normalized.
#[derive(Debug)]
pub struct ValidRegistration {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub user_type: UserType,
}

impl RegisterRequest {
    /// Collects every problem instead of stopping at the first one, so the
    /// caller can fix the whole form in one go.
    pub fn validate(&self) -> Result<ValidRegistration, Vec<String>> {
        let mut errors = Vec::new();

        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            errors.push("fullName must not be empty".to_string());
        }
        let phone = self.phone.trim().to_string();
        if !is_valid_phone(&phone) {
            errors.push("phone must be a valid phone number".to_string());
        }
        let email = self.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            errors.push("email must be a valid email address".to_string());
        }
        if self.password.len() < 8 {
            errors.push("password must be at least 8 characters".to_string());
        }
        let user_type = UserType::parse(&self.user_type);
        if user_type.is_none() {
            errors.push("userType must be one of the supported roles".to_string());
        }

        match user_type {
            Some(user_type) if errors.is_empty() => Ok(ValidRegistration {
                full_name,
                phone,
                email,
                user_type,
            }),
            _ => Err(errors),
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User shape returned by register and login. Phone and login history stay
/// hidden here; the /me snapshot exposes them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub user_type: UserType,
    pub verified: bool,
    pub profile_complete: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            verified: user.verified,
            profile_complete: user.profile_complete,
            created_at: user.created_at,
        }
    }
}

/// Full user snapshot returned by /me.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    pub verified: bool,
    pub profile_complete: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            user_type: user.user_type,
            verified: user.verified,
            profile_complete: user.profile_complete,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub total_users: usize,
    pub verified_users: usize,
    pub users_by_type: HashMap<String, usize>,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsBody,
}
