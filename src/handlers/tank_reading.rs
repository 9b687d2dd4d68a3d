use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use validator::Validate;

use crate::dtos::tank_reading::{TankReadingResponse, UpsertTankReadingRequest};
use crate::error::AppError;
use crate::handlers::shift::{fetch_shift, lock_open_shift};
use crate::middleware::auth::AuthContext;
use crate::models::shift::TankReading;
use crate::reconciliation::{meter, tank};
use crate::state::AppState;

const TANK_READING_SELECT: &str = "SELECT tr.id, tr.shift_id, tr.tank_id, t.code AS tank_code,
        tr.start_level::FLOAT8 AS start_level, tr.total_refills::FLOAT8 AS total_refills,
        tr.total_usage::FLOAT8 AS total_usage, tr.calculated_level::FLOAT8 AS calculated_level,
        tr.actual_level::FLOAT8 AS actual_level, tr.difference::FLOAT8 AS difference,
        tr.difference_percent, tr.updated_at
    FROM tank_readings tr
    JOIN tanks t ON t.id = tr.tank_id";

/// What to do with the stored physical dip when re-reconciling a tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DipUpdate {
    Keep,
    Replace(Option<f64>),
}

pub(crate) async fn fetch_tank_readings(db_pool: &PgPool, shift_id: i64) -> Result<Vec<TankReading>, AppError> {
    let readings = sqlx::query_as::<_, TankReading>(&format!(
        "{TANK_READING_SELECT} WHERE tr.shift_id = $1 ORDER BY t.code"
    ))
    .bind(shift_id)
    .fetch_all(db_pool)
    .await?;
    Ok(readings)
}

/// Start level of tank `t` in shift `cur`: the dip taken in the shift right
/// before `cur` (cancelled shifts skipped), else the tank's current level.
/// Older dips are never used since refills may have landed after them.
pub(crate) const CARRIED_LEVEL_SQL: &str = "COALESCE((
        SELECT tr.actual_level FROM shifts p
        LEFT JOIN tank_readings tr ON tr.shift_id = p.id AND tr.tank_id = t.id
        WHERE p.status <> 'CANCELLED'
          AND (p.start_time, p.id) < (cur.start_time, cur.id)
        ORDER BY p.start_time DESC, p.id DESC
        LIMIT 1
    ), t.current_level)";

/// Start level for a tank that has no stub in this shift yet.
async fn carried_start_level(conn: &mut PgConnection, shift_id: i64, tank_id: i64) -> Result<f64, AppError> {
    let level: Option<f64> = sqlx::query_scalar(&format!(
        "SELECT ({CARRIED_LEVEL_SQL})::FLOAT8
         FROM tanks t CROSS JOIN shifts cur
         WHERE t.id = $1 AND cur.id = $2"
    ))
    .bind(tank_id)
    .bind(shift_id)
    .fetch_optional(&mut *conn)
    .await?;

    level.ok_or_else(|| AppError::not_found("Tank not found"))
}

/// Recomputes the tank reading of `(shift, tank)` from all meter readings of
/// dispensers attached to the tank and all refills of the shift, then upserts it.
pub(crate) async fn reconcile_tank(
    conn: &mut PgConnection,
    shift_id: i64,
    tank_id: i64,
    dip: DipUpdate,
    user_id: i64,
) -> Result<tank::TankLevels, AppError> {
    let existing: Option<(f64, Option<f64>)> = sqlx::query_as(
        "SELECT start_level::FLOAT8, actual_level::FLOAT8 FROM tank_readings
         WHERE shift_id = $1 AND tank_id = $2",
    )
    .bind(shift_id)
    .bind(tank_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (start_level, stored_actual) = match existing {
        Some(row) => row,
        None => (carried_start_level(conn, shift_id, tank_id).await?, None),
    };
    let actual_level = match dip {
        DipUpdate::Keep => stored_actual,
        DipUpdate::Replace(level) => level,
    };

    let meters: Vec<(Option<f64>, f64, f64)> = sqlx::query_as(
        "SELECT mr.total_liters::FLOAT8, mr.test_liters::FLOAT8, mr.usage_liters::FLOAT8
         FROM meter_readings mr
         JOIN dispensers d ON d.id = mr.dispenser_id
         WHERE mr.shift_id = $1 AND d.tank_id = $2",
    )
    .bind(shift_id)
    .bind(tank_id)
    .fetch_all(&mut *conn)
    .await?;

    let total_usage: f64 = meters
        .iter()
        .map(|&(liters, test, usage)| meter::tank_usage(liters, test, usage))
        .sum();

    let total_refills: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::FLOAT8 FROM tank_refills WHERE shift_id = $1 AND tank_id = $2",
    )
    .bind(shift_id)
    .bind(tank_id)
    .fetch_one(&mut *conn)
    .await?;

    let levels = tank::levels(start_level, total_refills, total_usage, actual_level);

    sqlx::query(
        "INSERT INTO tank_readings
            (shift_id, tank_id, start_level, total_refills, total_usage, calculated_level,
             actual_level, difference, difference_percent, updated_by, updated_at)
         VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7::FLOAT8, $8::FLOAT8, $9, $10, NOW())
         ON CONFLICT (shift_id, tank_id) DO UPDATE SET
            total_refills = EXCLUDED.total_refills,
            total_usage = EXCLUDED.total_usage,
            calculated_level = EXCLUDED.calculated_level,
            actual_level = EXCLUDED.actual_level,
            difference = EXCLUDED.difference,
            difference_percent = EXCLUDED.difference_percent,
            updated_by = EXCLUDED.updated_by,
            updated_at = NOW()",
    )
    .bind(shift_id)
    .bind(tank_id)
    .bind(start_level)
    .bind(total_refills)
    .bind(total_usage)
    .bind(levels.calculated_level)
    .bind(actual_level)
    .bind(levels.difference)
    .bind(levels.difference_percent)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(levels)
}

// GET /shifts/:id/tank-readings
#[instrument(skip(state))]
pub async fn list_tank_readings(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TankReadingResponse>>, AppError> {
    fetch_shift(&state.db_pool, shift_id).await?;
    let readings = fetch_tank_readings(&state.db_pool, shift_id).await?;
    Ok(Json(readings.into_iter().map(TankReadingResponse::from).collect()))
}

// PUT /shifts/:id/tank-readings - tank check, one per (shift, tank)
#[instrument(skip(state, auth, payload))]
pub async fn upsert_tank_reading(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpsertTankReadingRequest>,
) -> Result<Json<TankReadingResponse>, AppError> {
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;
    lock_open_shift(&mut tx, shift_id).await?;

    let levels = reconcile_tank(
        &mut tx,
        shift_id,
        payload.tank_id,
        DipUpdate::Replace(payload.actual_level),
        auth.user_id,
    )
    .await?;

    // A physical dip is the best known level of the tank
    if let Some(level) = payload.actual_level {
        sqlx::query("UPDATE tanks SET current_level = $2::FLOAT8 WHERE id = $1")
            .bind(payload.tank_id)
            .bind(level)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if let Some(diff) = levels.difference {
        info!(
            shift_id,
            tank_id = payload.tank_id,
            calculated = levels.calculated_level,
            difference = diff,
            difference_percent = ?levels.difference_percent,
            "Tank check recorded"
        );
    }

    let reading = sqlx::query_as::<_, TankReading>(&format!(
        "{TANK_READING_SELECT} WHERE tr.shift_id = $1 AND tr.tank_id = $2"
    ))
    .bind(shift_id)
    .bind(payload.tank_id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(Json(TankReadingResponse::from(reading)))
}
