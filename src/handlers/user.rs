use bcrypt::{hash, verify, DEFAULT_COST};
use axum::{extract::{Path, State}, http::StatusCode, Extension, Json};
use validator::Validate;

use crate::auth::jwt::sign_token;
use crate::dtos::user::{CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest, UserResponse};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::user::User;
use crate::state::AppState;

const USER_COLUMNS: &str = "id, username, password_hash, full_name, role, is_active, created_at";

pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(payload.username.trim())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(AppError::forbidden("User inactive"));
    }

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;

    if !ok {
        tracing::info!(username = %user.username, "Failed login attempt");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let ttl_hours = state.config.token_ttl_hours;
    let token = sign_token(user.id, user.role, &user.username, &state.config.jwt_secret, ttl_hours)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: ttl_hours * 60 * 60,
        user: UserResponse::from(user),
    }))
}

// Authenticated endpoint: returns full user profile from DB using the id in AuthContext
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(auth.user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth.require_admin()?;

    let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    auth.require_admin()?;
    payload.validate()?;

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, full_name, role)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(payload.username.trim())
    .bind(password_hash)
    .bind(payload.full_name)
    .bind(payload.role)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Username already exists"))?;

    tracing::info!(username = %user.username, role = user.role.as_str(), created_by = %auth.username, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_admin()?;
    payload.validate()?;

    // An admin cannot lock themselves out
    if id == auth.user_id && (payload.is_active == Some(false) || payload.role.is_some_and(|r| r != auth.role)) {
        return Err(AppError::validation("You cannot deactivate or demote your own account"));
    }

    let password_hash = payload
        .password
        .as_deref()
        .map(|p| hash(p, DEFAULT_COST))
        .transpose()
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            full_name = COALESCE($2, full_name),
            role = COALESCE($3, role),
            is_active = COALESCE($4, is_active),
            password_hash = COALESCE($5, password_hash)
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(payload.full_name)
    .bind(payload.role)
    .bind(payload.is_active)
    .bind(password_hash)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
