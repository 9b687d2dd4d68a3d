use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};
use validator::Validate;

use crate::dtos::meter_reading::{MeterReadingResponse, UpsertMeterReadingRequest};
use crate::error::AppError;
use crate::handlers::shift::{fetch_shift, lock_open_shift};
use crate::handlers::tank_reading::{reconcile_tank, DipUpdate};
use crate::middleware::auth::AuthContext;
use crate::models::shift::MeterReading;
use crate::reconciliation::meter::MeterTotals;
use crate::state::AppState;

const METER_SELECT: &str = "SELECT mr.id, mr.shift_id, mr.dispenser_id, d.code AS dispenser_code,
        d.tank_id, t.fuel_type_id,
        mr.start_reading::FLOAT8 AS start_reading, mr.end_reading::FLOAT8 AS end_reading,
        mr.test_liters::FLOAT8 AS test_liters, mr.usage_liters::FLOAT8 AS usage_liters,
        mr.discount::FLOAT8 AS discount,
        mr.total_liters::FLOAT8 AS total_liters, mr.total_amount::FLOAT8 AS total_amount,
        mr.updated_at
    FROM meter_readings mr
    JOIN dispensers d ON d.id = mr.dispenser_id
    JOIN tanks t ON t.id = d.tank_id";

pub(crate) async fn fetch_meter_readings(db_pool: &PgPool, shift_id: i64) -> Result<Vec<MeterReading>, AppError> {
    let readings = sqlx::query_as::<_, MeterReading>(&format!(
        "{METER_SELECT} WHERE mr.shift_id = $1 ORDER BY d.code"
    ))
    .bind(shift_id)
    .fetch_all(db_pool)
    .await?;
    Ok(readings)
}

async fn shift_price(conn: &mut PgConnection, shift_id: i64, fuel_type_id: i64) -> Result<Option<f64>, AppError> {
    let price = sqlx::query_scalar(
        "SELECT price::FLOAT8 FROM shift_fuel_prices WHERE shift_id = $1 AND fuel_type_id = $2",
    )
    .bind(shift_id)
    .bind(fuel_type_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(price)
}

/// Start value of dispenser `d` in shift `cur`: the last closed meter value
/// from an earlier non-cancelled shift, else 0.
pub(crate) const CARRIED_METER_SQL: &str = "COALESCE((
        SELECT mr.end_reading FROM meter_readings mr
        JOIN shifts p ON p.id = mr.shift_id
        WHERE mr.dispenser_id = d.id
          AND mr.end_reading IS NOT NULL
          AND p.status <> 'CANCELLED'
          AND (p.start_time, p.id) < (cur.start_time, cur.id)
        ORDER BY p.start_time DESC, p.id DESC
        LIMIT 1
    ), 0)";

async fn carried_start_reading(conn: &mut PgConnection, shift_id: i64, dispenser_id: i64) -> Result<f64, AppError> {
    let start: Option<f64> = sqlx::query_scalar(&format!(
        "SELECT ({CARRIED_METER_SQL})::FLOAT8
         FROM dispensers d CROSS JOIN shifts cur
         WHERE d.id = $1 AND cur.id = $2"
    ))
    .bind(dispenser_id)
    .bind(shift_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(start.unwrap_or(0.0))
}

/// Recomputes liters and amounts of every meter in the shift against the
/// shift price snapshot.
pub(crate) async fn reprice_meter_readings(conn: &mut PgConnection, shift_id: i64) -> Result<(), AppError> {
    let readings = sqlx::query_as::<_, MeterReading>(&format!("{METER_SELECT} WHERE mr.shift_id = $1"))
        .bind(shift_id)
        .fetch_all(&mut *conn)
        .await?;

    for reading in &readings {
        let price = shift_price(conn, shift_id, reading.fuel_type_id).await?;
        let totals = MeterTotals::compute(
            reading.start_reading,
            reading.end_reading,
            reading.test_liters,
            reading.usage_liters,
            reading.discount,
            price,
        );

        sqlx::query(
            "UPDATE meter_readings SET total_liters = $2::FLOAT8, total_amount = $3::FLOAT8 WHERE id = $1",
        )
        .bind(reading.id)
        .bind(totals.total_liters)
        .bind(totals.total_amount)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// GET /shifts/:id/meter-readings
#[instrument(skip(state))]
pub async fn list_meter_readings(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MeterReadingResponse>>, AppError> {
    fetch_shift(&state.db_pool, shift_id).await?;
    let readings = fetch_meter_readings(&state.db_pool, shift_id).await?;
    Ok(Json(readings.into_iter().map(MeterReadingResponse::from).collect()))
}

// PUT /shifts/:id/meter-readings - one reading per (shift, dispenser); recording again overwrites
#[instrument(skip(state, auth, payload))]
pub async fn upsert_meter_reading(
    Path(shift_id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpsertMeterReadingRequest>,
) -> Result<Json<MeterReadingResponse>, AppError> {
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;
    lock_open_shift(&mut tx, shift_id).await?;

    let (tank_id, fuel_type_id): (i64, i64) = sqlx::query_as(
        "SELECT d.tank_id, t.fuel_type_id FROM dispensers d
         JOIN tanks t ON t.id = d.tank_id
         WHERE d.id = $1",
    )
    .bind(payload.dispenser_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Dispenser not found"))?;

    let start_reading = match payload.start_reading {
        Some(start) => start,
        None => {
            let existing: Option<f64> = sqlx::query_scalar(
                "SELECT start_reading::FLOAT8 FROM meter_readings WHERE shift_id = $1 AND dispenser_id = $2",
            )
            .bind(shift_id)
            .bind(payload.dispenser_id)
            .fetch_optional(&mut *tx)
            .await?;
            match existing {
                Some(start) => start,
                None => carried_start_reading(&mut tx, shift_id, payload.dispenser_id).await?,
            }
        }
    };

    let price = shift_price(&mut tx, shift_id, fuel_type_id).await?;
    let totals = MeterTotals::compute(
        start_reading,
        payload.end_reading,
        payload.test_liters,
        payload.usage_liters,
        payload.discount,
        price,
    );

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO meter_readings
            (shift_id, dispenser_id, start_reading, end_reading, test_liters, usage_liters,
             discount, total_liters, total_amount, updated_by, updated_at)
         VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7::FLOAT8, $8::FLOAT8, $9::FLOAT8, $10, NOW())
         ON CONFLICT (shift_id, dispenser_id) DO UPDATE SET
            start_reading = EXCLUDED.start_reading,
            end_reading = EXCLUDED.end_reading,
            test_liters = EXCLUDED.test_liters,
            usage_liters = EXCLUDED.usage_liters,
            discount = EXCLUDED.discount,
            total_liters = EXCLUDED.total_liters,
            total_amount = EXCLUDED.total_amount,
            updated_by = EXCLUDED.updated_by,
            updated_at = NOW()
         RETURNING id",
    )
    .bind(shift_id)
    .bind(payload.dispenser_id)
    .bind(start_reading)
    .bind(payload.end_reading)
    .bind(payload.test_liters)
    .bind(payload.usage_liters)
    .bind(payload.discount)
    .bind(totals.total_liters)
    .bind(totals.total_amount)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    // Tank level depends on every meter drawing from it
    reconcile_tank(&mut tx, shift_id, tank_id, DipUpdate::Keep, auth.user_id).await?;

    tx.commit().await?;

    debug!(shift_id, dispenser_id = payload.dispenser_id, total_liters = ?totals.total_liters, "Meter reading recorded");

    let reading = sqlx::query_as::<_, MeterReading>(&format!("{METER_SELECT} WHERE mr.id = $1"))
        .bind(id)
        .fetch_one(&state.db_pool)
        .await?;

    Ok(Json(MeterReadingResponse::from(reading)))
}
