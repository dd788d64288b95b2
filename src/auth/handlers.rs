use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            is_valid_email, LoginRequest, LoginResponse, MeResponse, MessageResponse,
            PublicUser, RegisterRequest, RegisterResponse, StatsBody, StatsResponse,
            UserSnapshot,
        },
        extractors::{ClientKey, MaybeBearer},
        password,
    },
    error::AuthError,
    rate_limit::Decision,
    state::AppState,
    store::NewUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/stats", get(stats))
}

fn generate_verification_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Rejected attempts must not touch any store, so the throttle check comes
/// before everything else.
async fn check_auth_rate(state: &AppState, client: &str) -> Result<(), AuthError> {
    match state
        .limiter
        .allow(client, &state.config.rate_limit.auth())
        .await
    {
        Decision::Allowed => Ok(()),
        Decision::Rejected { retry_after } => {
            warn!(client = %client, "auth rate limit exhausted");
            Err(AuthError::RateLimited { retry_after })
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    check_auth_rate(&state, &client).await?;

    let valid = payload.validate().map_err(|errors| {
        warn!(client = %client, ?errors, "register validation failed");
        AuthError::Validation(errors)
    })?;

    let security = &state.config.security;
    let password_hash = password::hash_password(
        &payload.password,
        security.hash_memory_kib,
        security.hash_iterations,
    )?;

    let user = state
        .users
        .create(NewUser {
            full_name: valid.full_name,
            email: valid.email,
            phone: valid.phone,
            password_hash,
            user_type: valid.user_type,
            verification_code: generate_verification_code(),
        })
        .await
        .map_err(|e| {
            warn!(client = %client, "register conflict or backend failure");
            AuthError::from(e)
        })?;

    // Delivery of the code is an external concern; it is echoed back only in
    // non-production deployments.
    let verification_code = state
        .config
        .expose_verification_code
        .then(|| user.verification_code.clone());

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful, please verify your email".into(),
            user: PublicUser::from(&user),
            verification_code,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    check_auth_rate(&state, &client).await?;

    let email = payload.email.trim().to_lowercase();
    let mut errors = Vec::new();
    if !is_valid_email(&email) {
        errors.push("email must be a valid email address".to_string());
    }
    if payload.password.is_empty() {
        errors.push("password must not be empty".to_string());
    }
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let user = match state.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            // Same response and comparable work as a wrong password, so the
            // endpoint cannot be used to probe which emails exist.
            password::dummy_verify(&payload.password);
            warn!(client = %client, "login with unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(client = %client, user_id = %user.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;
    state
        .sessions
        .open(user.id, &token, state.config.session_ttl())
        .await;
    state.users.touch_login(user.id).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: PublicUser::from(&user),
    }))
}

/// Fail-open: always reports success, so the response leaks nothing about
/// whether the token was known.
#[instrument(skip(state, token))]
pub async fn logout(
    State(state): State<AppState>,
    MaybeBearer(token): MaybeBearer,
) -> Json<MessageResponse> {
    if let Some(token) = token {
        state.sessions.close(&token).await;
    }
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}

#[instrument(skip(state, token))]
pub async fn me(
    State(state): State<AppState>,
    MaybeBearer(token): MaybeBearer,
) -> Result<Json<MeResponse>, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let claims = state
        .tokens
        .decode(&token)
        .map_err(|_| AuthError::Unauthorized)?;
    // A structurally valid token is only trusted once the session registry
    // confirms it has not been revoked or expired.
    state
        .sessions
        .lookup(&token)
        .await
        .map_err(|_| AuthError::Unauthorized)?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(MeResponse {
        success: true,
        user: UserSnapshot::from(&user),
    }))
}

#[instrument(skip(state, token))]
pub async fn stats(
    State(state): State<AppState>,
    MaybeBearer(token): MaybeBearer,
) -> Result<Json<StatsResponse>, AuthError> {
    if state.config.protect_stats {
        let token = token.ok_or(AuthError::MissingToken)?;
        state
            .tokens
            .decode(&token)
            .map_err(|_| AuthError::Unauthorized)?;
        state
            .sessions
            .lookup(&token)
            .await
            .map_err(|_| AuthError::Unauthorized)?;
    }

    let users = state.users.stats().await?;
    let active_sessions = state.sessions.count_active().await;
    Ok(Json(StatsResponse {
        success: true,
        stats: StatsBody {
            total_users: users.total,
            verified_users: users.verified,
            users_by_type: users.by_type,
            active_sessions,
        },
    }))
}
