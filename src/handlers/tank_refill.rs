use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::{info, instrument};
use validator::Validate;

use crate::dtos::tank_reading::{CreateTankRefillRequest, TankRefillResponse};
use crate::error::AppError;
use crate::handlers::shift::{fetch_shift, lock_open_shift};
use crate::handlers::tank_reading::{reconcile_tank, DipUpdate};
use crate::middleware::auth::AuthContext;
use crate::models::shift::TankRefill;
use crate::state::AppState;

const REFILL_COLUMNS: &str = "id, shift_id, tank_id, amount::FLOAT8 AS amount, note, created_by, created_at";

pub(crate) async fn fetch_refills(db_pool: &PgPool, shift_id: i64) -> Result<Vec<TankRefill>, AppError> {
    let refills = sqlx::query_as::<_, TankRefill>(&format!(
        "SELECT {REFILL_COLUMNS} FROM tank_refills WHERE shift_id = $1 ORDER BY created_at, id"
    ))
    .bind(shift_id)
    .fetch_all(db_pool)
    .await?;
    Ok(refills)
}

// GET /shifts/:id/refills
#[instrument(skip(state))]
pub async fn list_refills(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TankRefillResponse>>, AppError> {
    fetch_shift(&state.db_pool, shift_id).await?;
    let refills = fetch_refills(&state.db_pool, shift_id).await?;
    Ok(Json(refills.into_iter().map(TankRefillResponse::from).collect()))
}

// POST /shifts/:id/refills - fuel delivered into a tank during the shift
#[instrument(skip(state, auth, payload))]
pub async fn create_refill(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateTankRefillRequest>,
) -> Result<(StatusCode, Json<TankRefillResponse>), AppError> {
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;
    lock_open_shift(&mut tx, shift_id).await?;

    let (capacity, current_level): (f64, f64) = sqlx::query_as(
        "SELECT capacity::FLOAT8, current_level::FLOAT8 FROM tanks WHERE id = $1 FOR UPDATE",
    )
    .bind(payload.tank_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Tank not found"))?;

    if current_level + payload.amount > capacity {
        tracing::warn!(
            tank_id = payload.tank_id,
            capacity,
            level_after = current_level + payload.amount,
            "Refill exceeds recorded tank capacity"
        );
    }

    let refill = sqlx::query_as::<_, TankRefill>(&format!(
        "INSERT INTO tank_refills (shift_id, tank_id, amount, note, created_by)
         VALUES ($1, $2, $3::FLOAT8, $4, $5)
         RETURNING {REFILL_COLUMNS}"
    ))
    .bind(shift_id)
    .bind(payload.tank_id)
    .bind(payload.amount)
    .bind(payload.note)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE tanks SET current_level = current_level + $2::FLOAT8 WHERE id = $1")
        .bind(payload.tank_id)
        .bind(payload.amount)
        .execute(&mut *tx)
        .await?;

    reconcile_tank(&mut tx, shift_id, payload.tank_id, DipUpdate::Keep, auth.user_id).await?;

    tx.commit().await?;

    info!(shift_id, tank_id = refill.tank_id, amount = refill.amount, by = %auth.username, "Tank refill recorded");
    Ok((StatusCode::CREATED, Json(TankRefillResponse::from(refill))))
}
