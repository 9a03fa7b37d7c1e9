//! Authentication handlers: register, login, logout, profile

use axum::{Extension, Json, extract::State, response::Response};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::AuthSession;
use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientIp;
use crate::models::{PublicUser, User};
use crate::rate_limiter::{RateLimit, retry_after_secs};
use crate::state::AppState;
use crate::validation::{
    ValidationErrors, validate_email, validate_name, validate_password,
    validate_password_confirmation,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn throttle(state: &AppState, key: &str, limit: RateLimit) -> Result<(), ApiError> {
    state
        .rate_limiter
        .check(key, limit)
        .await
        .map(drop)
        .map_err(|retry| ApiError::RateLimited {
            retry_after: retry_after_secs(retry),
        })
}

fn session_payload(user: &User, token: String) -> serde_json::Value {
    json!({
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
        },
        "token": token,
    })
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Response> {
    let email = payload.email.trim().to_lowercase();

    // Throttled before validation, so probing with garbage input still
    // consumes attempts.
    throttle(&state, &format!("register:ip:{ip}"), state.limits.register_per_ip).await?;
    if let Some((_, domain)) = email.split_once('@') {
        throttle(
            &state,
            &format!("register:domain:{domain}"),
            state.limits.register_per_domain,
        )
        .await?;
    }

    let mut errors = ValidationErrors::new();
    errors.check("name", validate_name(&payload.name));
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&payload.password));
    errors.check(
        "password",
        validate_password_confirmation(&payload.password, &payload.password_confirmation),
    );
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let (user, token) = state
        .auth
        .register(payload.name.trim(), &email, &payload.password)
        .await?;

    Ok(crate::response::created(
        "Registration successful",
        session_payload(&user, token),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim();

    throttle(&state, &format!("login:ip:{ip}"), state.limits.login_per_ip).await?;
    if !email.is_empty() {
        throttle(
            &state,
            &format!("login:email:{email}"),
            state.limits.login_per_email,
        )
        .await?;
    }

    let mut errors = ValidationErrors::new();
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(password));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let (user, token) = state.auth.login(&email, password).await?;

    Ok(crate::response::ok(
        "Login successful",
        session_payload(&user, token),
    ))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Response> {
    state.auth.revoke(session.token_id, session.user.id).await;
    Ok(crate::response::ok_empty("Logout successful"))
}

/// GET /profile
pub async fn profile(Extension(session): Extension<AuthSession>) -> ApiResult<Response> {
    info!(user_id = session.user.id, "profile access");
    Ok(crate::response::ok(
        "Profile retrieved successfully",
        json!({"user": PublicUser::from(&session.user)}),
    ))
}
