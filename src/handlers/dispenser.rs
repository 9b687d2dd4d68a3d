use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::instrument;
use validator::Validate;

use crate::dtos::dispenser::{CreateDispenserRequest, DispenserResponse, UpdateDispenserRequest};
use crate::error::{map_in_use, map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::dispenser::Dispenser;
use crate::state::AppState;

// Fuel type always comes through the tank
const DISPENSER_SELECT: &str = "SELECT d.id, d.code, d.name, d.tank_id, t.code AS tank_code,
        t.fuel_type_id, ft.name AS fuel_type_name, d.is_active, d.created_at
    FROM dispensers d
    JOIN tanks t ON t.id = d.tank_id
    JOIN fuel_types ft ON ft.id = t.fuel_type_id";

async fn fetch_dispenser(db_pool: &PgPool, id: i64) -> Result<Dispenser, AppError> {
    sqlx::query_as::<_, Dispenser>(&format!("{DISPENSER_SELECT} WHERE d.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Dispenser not found"))
}

async fn ensure_tank(db_pool: &PgPool, tank_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tanks WHERE id = $1)")
        .bind(tank_id)
        .fetch_one(db_pool)
        .await?;
    if !exists {
        return Err(AppError::not_found("Tank not found"));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_dispensers(State(state): State<AppState>) -> Result<Json<Vec<DispenserResponse>>, AppError> {
    let dispensers = sqlx::query_as::<_, Dispenser>(&format!("{DISPENSER_SELECT} ORDER BY d.code"))
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(dispensers.into_iter().map(DispenserResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_dispenser(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DispenserResponse>, AppError> {
    Ok(Json(DispenserResponse::from(fetch_dispenser(&state.db_pool, id).await?)))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_dispenser(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateDispenserRequest>,
) -> Result<(StatusCode, Json<DispenserResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;
    ensure_tank(&state.db_pool, payload.tank_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO dispensers (code, name, tank_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.tank_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Dispenser code already exists"))?;

    let dispenser = fetch_dispenser(&state.db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(DispenserResponse::from(dispenser))))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_dispenser(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateDispenserRequest>,
) -> Result<Json<DispenserResponse>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    if let Some(tank_id) = payload.tank_id {
        ensure_tank(&state.db_pool, tank_id).await?;
    }

    let result = sqlx::query(
        "UPDATE dispensers SET
            name = COALESCE($2, name),
            tank_id = COALESCE($3, tank_id),
            is_active = COALESCE($4, is_active)
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.tank_id)
    .bind(payload.is_active)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Dispenser not found"));
    }

    Ok(Json(DispenserResponse::from(fetch_dispenser(&state.db_pool, id).await?)))
}

#[instrument(skip(state, auth))]
pub async fn delete_dispenser(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    let result = sqlx::query("DELETE FROM dispensers WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| map_in_use(e, "Dispenser has meter readings; deactivate it instead"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Dispenser not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
