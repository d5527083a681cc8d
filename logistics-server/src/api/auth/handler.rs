//! Authentication Handlers
//!
//! Registration, login, refresh-token rotation, profile.

use axum::{
    Json,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::{CurrentUser, password};
use crate::core::ServerState;
use crate::db::repository::user as user_repo;
use crate::events::types as events;
use crate::utils::{ApiResponse, AppError, AppResult, created, ok, ok_with_message};
use shared::models::{Role, UserPublic};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Option<Role>,
    pub vendor_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserPublic,
    pub token: String,
    pub refresh_token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    payload
        .validate()
        .map_err(|e| validation_error(&e))?;

    if user_repo::find_by_email(&state.pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("Email already exists"));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::User);
    let user = user_repo::create(
        &state.pool,
        &payload.name,
        &payload.email,
        &password_hash,
        role,
        payload.vendor_id,
    )
    .await?;

    let token = state
        .jwt
        .generate_token(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;
    let (ip, user_agent) = client_info(&headers);
    let refresh_token = state.refresh_tokens.issue(user.id, ip, user_agent)?;

    let user_public = UserPublic::from(user);
    state
        .events
        .emit(events::AUTH_REGISTERED, json!({ "user": user_public }));

    tracing::info!(user_id = user_public.id, email = %user_public.email, "User registered");

    Ok(created(
        AuthResponse {
            user: user_public,
            token,
            refresh_token,
        },
        "User created successfully",
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    payload
        .validate()
        .map_err(|e| validation_error(&e))?;

    // Unified failure path: unknown email and wrong password are
    // indistinguishable to the caller
    let user = user_repo::find_by_email(&state.pool, &payload.email)
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(target: "security", email = %payload.email, "login_failed");
        return Err(AppError::invalid_credentials());
    }

    if !user.is_active {
        return Err(AppError::forbidden("Account has been disabled"));
    }

    let token = state
        .jwt
        .generate_token(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;
    let (ip, user_agent) = client_info(&headers);
    let refresh_token = state.refresh_tokens.issue(user.id, ip, user_agent)?;

    let user_public = UserPublic::from(user);
    state
        .events
        .emit(events::AUTH_LOGIN, json!({ "user": user_public }));

    tracing::info!(user_id = user_public.id, "User logged in");

    Ok(ok_with_message(
        AuthResponse {
            user: user_public,
            token,
            refresh_token,
        },
        "Login successful",
    ))
}

/// POST /api/auth/refresh
///
/// Rotation is delete-then-issue: the old token is consumed before a new
/// pair is minted, so a rotated token can never be replayed.
pub async fn refresh(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    if payload.refresh_token.len() < 20 {
        return Err(AppError::validation("refreshToken is required"));
    }

    let record = state.refresh_tokens.consume(&payload.refresh_token)?;

    let user = user_repo::find_by_id(&state.pool, record.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized_msg("User no longer exists"))?;
    if !user.is_active {
        return Err(AppError::forbidden("Account has been disabled"));
    }

    let token = state
        .jwt
        .generate_token(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;
    let (ip, user_agent) = client_info(&headers);
    let refresh_token = state.refresh_tokens.issue(user.id, ip, user_agent)?;

    Ok(ok_with_message(
        AuthResponse {
            user: UserPublic::from(user),
            token,
            refresh_token,
        },
        "Token refreshed",
    ))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<UserPublic>>> {
    let user = user_repo::find_by_id(&state.pool, current_user.id)
        .await?
        .ok_or_else(|| AppError::unauthorized_msg("User no longer exists"))?;
    Ok(ok(UserPublic::from(user)))
}

fn client_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}

fn validation_error(errors: &validator::ValidationErrors) -> AppError {
    let details = serde_json::to_value(errors).unwrap_or(serde_json::Value::Null);
    AppError::validation_with_details("Validation error", details)
}
