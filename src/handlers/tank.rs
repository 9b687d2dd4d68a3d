use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::instrument;
use validator::Validate;

use crate::dtos::tank::{CreateTankRequest, TankResponse, UpdateTankRequest};
use crate::error::{map_in_use, map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::tank::Tank;
use crate::state::AppState;

const TANK_SELECT: &str = "SELECT t.id, t.code, t.name, t.fuel_type_id, ft.name AS fuel_type_name,
        t.capacity::FLOAT8 AS capacity, t.current_level::FLOAT8 AS current_level,
        t.is_active, t.created_at
    FROM tanks t
    JOIN fuel_types ft ON ft.id = t.fuel_type_id";

async fn fetch_tank(db_pool: &PgPool, id: i64) -> Result<Tank, AppError> {
    sqlx::query_as::<_, Tank>(&format!("{TANK_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Tank not found"))
}

async fn ensure_fuel_type(db_pool: &PgPool, fuel_type_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fuel_types WHERE id = $1)")
        .bind(fuel_type_id)
        .fetch_one(db_pool)
        .await?;
    if !exists {
        return Err(AppError::not_found("Fuel type not found"));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_tanks(State(state): State<AppState>) -> Result<Json<Vec<TankResponse>>, AppError> {
    let tanks = sqlx::query_as::<_, Tank>(&format!("{TANK_SELECT} ORDER BY t.code"))
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(tanks.into_iter().map(TankResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_tank(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<TankResponse>, AppError> {
    Ok(Json(TankResponse::from(fetch_tank(&state.db_pool, id).await?)))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_tank(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateTankRequest>,
) -> Result<(StatusCode, Json<TankResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let current_level = payload.current_level.unwrap_or(0.0);
    if current_level > payload.capacity {
        return Err(AppError::field("current_level", "Level cannot exceed capacity"));
    }

    ensure_fuel_type(&state.db_pool, payload.fuel_type_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO tanks (code, name, fuel_type_id, capacity, current_level)
         VALUES ($1, $2, $3, $4::FLOAT8, $5::FLOAT8)
         RETURNING id",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.fuel_type_id)
    .bind(payload.capacity)
    .bind(current_level)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Tank code already exists"))?;

    let tank = fetch_tank(&state.db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(TankResponse::from(tank))))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_tank(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateTankRequest>,
) -> Result<Json<TankResponse>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    if let Some(fuel_type_id) = payload.fuel_type_id {
        ensure_fuel_type(&state.db_pool, fuel_type_id).await?;
    }

    let result = sqlx::query(
        "UPDATE tanks SET
            name = COALESCE($2, name),
            fuel_type_id = COALESCE($3, fuel_type_id),
            capacity = COALESCE($4::FLOAT8, capacity),
            is_active = COALESCE($5, is_active)
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.fuel_type_id)
    .bind(payload.capacity)
    .bind(payload.is_active)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Tank not found"));
    }

    Ok(Json(TankResponse::from(fetch_tank(&state.db_pool, id).await?)))
}

#[instrument(skip(state, auth))]
pub async fn delete_tank(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    let result = sqlx::query("DELETE FROM tanks WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| map_in_use(e, "Tank has dispensers or shift history; deactivate it instead"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Tank not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
