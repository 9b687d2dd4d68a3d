use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use validator::Validate;

use crate::dtos::meter_reading::MeterReadingResponse;
use crate::dtos::shift::{
    CreateShiftRequest, FuelSummary, ListShiftsQuery, SetShiftPricesRequest, ShiftDetailResponse,
    ShiftFuelPriceResponse, ShiftResponse,
};
use crate::dtos::tank_reading::{TankReadingResponse, TankRefillResponse};
use crate::error::AppError;
use crate::handlers::meter_reading::{fetch_meter_readings, reprice_meter_readings, CARRIED_METER_SQL};
use crate::handlers::tank_reading::{fetch_tank_readings, CARRIED_LEVEL_SQL};
use crate::handlers::tank_refill::fetch_refills;
use crate::middleware::auth::AuthContext;
use crate::models::sale::PaymentType;
use crate::models::shift::{MeterReading, Shift, ShiftFuelPrice, ShiftStatus};
use crate::reconciliation::sale::ShiftSalesTotals;
use crate::state::AppState;

const SHIFT_COLUMNS: &str = "id, name, start_time, end_time, status,
    cash_sales::FLOAT8 AS cash_sales, credit_sales::FLOAT8 AS credit_sales,
    total_sales::FLOAT8 AS total_sales, opened_by, closed_by, created_at";

pub(crate) async fn fetch_shift(db_pool: &PgPool, id: i64) -> Result<Shift, AppError> {
    sqlx::query_as::<_, Shift>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Shift not found"))
}

/// Row-locks the shift for the rest of the transaction.
pub(crate) async fn lock_shift(conn: &mut PgConnection, id: i64) -> Result<Shift, AppError> {
    sqlx::query_as::<_, Shift>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Shift not found"))
}

/// Locks the shift and rejects the write unless it is still ACTIVE.
pub(crate) async fn lock_open_shift(conn: &mut PgConnection, id: i64) -> Result<Shift, AppError> {
    let shift = lock_shift(conn, id).await?;
    shift.status.ensure_open()?;
    Ok(shift)
}

/// Rebuilds cash/credit/total sales from every sale of the shift.
pub(crate) async fn recompute_shift_totals(
    conn: &mut PgConnection,
    shift_id: i64,
) -> Result<ShiftSalesTotals, AppError> {
    let sales: Vec<(PaymentType, f64)> =
        sqlx::query_as("SELECT payment_type, total::FLOAT8 FROM sales WHERE shift_id = $1")
            .bind(shift_id)
            .fetch_all(&mut *conn)
            .await?;

    let totals = ShiftSalesTotals::aggregate(sales);

    sqlx::query(
        "UPDATE shifts SET cash_sales = $2::FLOAT8, credit_sales = $3::FLOAT8, total_sales = $4::FLOAT8
         WHERE id = $1",
    )
    .bind(shift_id)
    .bind(totals.cash_sales)
    .bind(totals.credit_sales)
    .bind(totals.total_sales)
    .execute(&mut *conn)
    .await?;

    Ok(totals)
}

async fn fetch_shift_prices(db_pool: &PgPool, shift_id: i64) -> Result<Vec<ShiftFuelPrice>, AppError> {
    let prices = sqlx::query_as::<_, ShiftFuelPrice>(
        "SELECT sfp.fuel_type_id, ft.name AS fuel_type_name, sfp.price::FLOAT8 AS price
         FROM shift_fuel_prices sfp
         JOIN fuel_types ft ON ft.id = sfp.fuel_type_id
         WHERE sfp.shift_id = $1
         ORDER BY ft.code",
    )
    .bind(shift_id)
    .fetch_all(db_pool)
    .await?;
    Ok(prices)
}

pub(crate) fn summarize_meters(readings: &[MeterReading]) -> FuelSummary {
    readings.iter().fold(FuelSummary::default(), |mut acc, m| {
        match m.total_liters {
            Some(liters) => acc.total_liters += liters,
            None => acc.open_meters += 1,
        }
        match m.total_amount {
            Some(amount) => acc.total_amount += amount,
            None if m.total_liters.is_some() => acc.unpriced_meters += 1,
            None => {}
        }
        acc
    })
}

async fn fetch_shift_detail(db_pool: &PgPool, id: i64) -> Result<ShiftDetailResponse, AppError> {
    let shift = fetch_shift(db_pool, id).await?;
    let prices = fetch_shift_prices(db_pool, id).await?;
    let meters = fetch_meter_readings(db_pool, id).await?;
    let tanks = fetch_tank_readings(db_pool, id).await?;
    let refills = fetch_refills(db_pool, id).await?;
    let sales_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE shift_id = $1")
        .bind(id)
        .fetch_one(db_pool)
        .await?;

    let fuel = summarize_meters(&meters);

    Ok(ShiftDetailResponse {
        shift: ShiftResponse::from(shift),
        prices: prices.into_iter().map(ShiftFuelPriceResponse::from).collect(),
        meter_readings: meters.into_iter().map(MeterReadingResponse::from).collect(),
        tank_readings: tanks.into_iter().map(TankReadingResponse::from).collect(),
        refills: refills.into_iter().map(TankRefillResponse::from).collect(),
        fuel,
        sales_count,
    })
}

// GET /shifts
#[instrument(skip(state))]
pub async fn list_shifts(
    State(state): State<AppState>,
    Query(query): Query<ListShiftsQuery>,
) -> Result<Json<Vec<ShiftResponse>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let shifts = sqlx::query_as::<_, Shift>(&format!(
        "SELECT {SHIFT_COLUMNS} FROM shifts
         WHERE ($1::shift_status IS NULL OR status = $1)
         ORDER BY start_time DESC, id DESC
         LIMIT $2"
    ))
    .bind(query.status)
    .bind(limit)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(shifts.into_iter().map(ShiftResponse::from).collect()))
}

// GET /shifts/:id
#[instrument(skip(state))]
pub async fn get_shift(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ShiftDetailResponse>, AppError> {
    fetch_shift_detail(&state.db_pool, id).await.map(Json)
}

// POST /shifts - open a shift and seed its readings from the previous one
#[instrument(skip(state, auth, payload))]
pub async fn create_shift(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateShiftRequest>,
) -> Result<(StatusCode, Json<ShiftDetailResponse>), AppError> {
    payload.validate()?;

    let name = payload.name.trim();
    let start_time = payload.start_time.unwrap_or_else(Utc::now);
    let window_secs = state.config.shift_duplicate_window_secs as f64;

    let mut tx = state.db_pool.begin().await?;

    let duplicate: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM shifts
            WHERE name = $1
              AND start_time BETWEEN $2 - make_interval(secs => $3) AND $2 + make_interval(secs => $3)
         )",
    )
    .bind(name)
    .bind(start_time)
    .bind(window_secs)
    .fetch_one(&mut *tx)
    .await?;

    if duplicate {
        return Err(AppError::conflict("A shift with this name and start time was just created"));
    }

    let shift_id: i64 = sqlx::query_scalar(
        "INSERT INTO shifts (name, start_time, status, opened_by)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(start_time)
    .bind(ShiftStatus::Active)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    // Price snapshot: price of every fuel type in effect when the shift starts
    let priced = sqlx::query(
        "INSERT INTO shift_fuel_prices (shift_id, fuel_type_id, price)
         SELECT DISTINCT ON (fp.fuel_type_id) $1, fp.fuel_type_id, fp.price
         FROM fuel_prices fp
         WHERE fp.effective_from <= $2
         ORDER BY fp.fuel_type_id, fp.effective_from DESC, fp.id DESC",
    )
    .bind(shift_id)
    .bind(start_time)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // One meter stub per active dispenser
    let meters = sqlx::query(&format!(
        "INSERT INTO meter_readings (shift_id, dispenser_id, start_reading, updated_by)
         SELECT cur.id, d.id, {CARRIED_METER_SQL}, $2
         FROM dispensers d CROSS JOIN shifts cur
         WHERE cur.id = $1 AND d.is_active"
    ))
    .bind(shift_id)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // One tank stub per active tank
    let tanks = sqlx::query(&format!(
        "INSERT INTO tank_readings (shift_id, tank_id, start_level, calculated_level, updated_by)
         SELECT x.shift_id, x.tank_id, x.level, x.level, $2
         FROM (
            SELECT cur.id AS shift_id, t.id AS tank_id, {CARRIED_LEVEL_SQL} AS level
            FROM tanks t CROSS JOIN shifts cur
            WHERE cur.id = $1 AND t.is_active
         ) x"
    ))
    .bind(shift_id)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    info!(shift_id, %name, priced, meters, tanks, by = %auth.username, "Shift opened");

    let detail = fetch_shift_detail(&state.db_pool, shift_id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn close_shift(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    next: ShiftStatus,
) -> Result<ShiftDetailResponse, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let shift = lock_shift(&mut tx, id).await?;
    let next = shift.status.transition(next)?;

    // Final recompute so the closed totals match the sales on record
    recompute_shift_totals(&mut tx, id).await?;

    sqlx::query("UPDATE shifts SET status = $2, end_time = NOW(), closed_by = $3 WHERE id = $1")
        .bind(id)
        .bind(next)
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(shift_id = id, status = ?next, by = %auth.username, "Shift closed");
    fetch_shift_detail(&state.db_pool, id).await
}

// POST /shifts/:id/complete
#[instrument(skip(state, auth))]
pub async fn complete_shift(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ShiftDetailResponse>, AppError> {
    close_shift(&state, &auth, id, ShiftStatus::Completed).await.map(Json)
}

// POST /shifts/:id/cancel
#[instrument(skip(state, auth))]
pub async fn cancel_shift(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ShiftDetailResponse>, AppError> {
    auth.require_manager()?;
    close_shift(&state, &auth, id, ShiftStatus::Cancelled).await.map(Json)
}

// GET /shifts/:id/prices
#[instrument(skip(state))]
pub async fn get_shift_prices(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ShiftFuelPriceResponse>>, AppError> {
    fetch_shift(&state.db_pool, id).await?;
    let prices = fetch_shift_prices(&state.db_pool, id).await?;
    Ok(Json(prices.into_iter().map(ShiftFuelPriceResponse::from).collect()))
}

// PUT /shifts/:id/prices - adjust the snapshot and reprice every meter
#[instrument(skip(state, auth, payload))]
pub async fn set_shift_prices(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<SetShiftPricesRequest>,
) -> Result<Json<Vec<ShiftFuelPriceResponse>>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;
    lock_open_shift(&mut tx, id).await?;

    for entry in &payload.prices {
        let written = sqlx::query(
            "INSERT INTO shift_fuel_prices (shift_id, fuel_type_id, price)
             SELECT $1, ft.id, $3::FLOAT8 FROM fuel_types ft WHERE ft.id = $2
             ON CONFLICT (shift_id, fuel_type_id) DO UPDATE SET price = EXCLUDED.price",
        )
        .bind(id)
        .bind(entry.fuel_type_id)
        .bind(entry.price)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if written == 0 {
            return Err(AppError::not_found(format!("Fuel type {} not found", entry.fuel_type_id)));
        }
    }

    reprice_meter_readings(&mut tx, id).await?;
    tx.commit().await?;

    let prices = fetch_shift_prices(&state.db_pool, id).await?;
    Ok(Json(prices.into_iter().map(ShiftFuelPriceResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(total_liters: Option<f64>, total_amount: Option<f64>) -> MeterReading {
        MeterReading {
            id: 1,
            shift_id: 1,
            dispenser_id: 1,
            dispenser_code: "D1".into(),
            tank_id: 1,
            fuel_type_id: 1,
            start_reading: 0.0,
            end_reading: total_liters,
            test_liters: 0.0,
            usage_liters: 0.0,
            discount: 0.0,
            total_liters,
            total_amount,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_open_and_unpriced_meters() {
        let readings = [
            reading(Some(485.0), Some(14_550.0)),
            reading(Some(100.0), None),
            reading(None, None),
        ];
        let summary = summarize_meters(&readings);
        assert_eq!(summary.total_liters, 585.0);
        assert_eq!(summary.total_amount, 14_550.0);
        assert_eq!(summary.open_meters, 1);
        assert_eq!(summary.unpriced_meters, 1);
    }

    mod db {
        use axum::{extract::{Path, State}, Extension, Json};
        use sqlx::PgPool;

        use crate::dtos::meter_reading::UpsertMeterReadingRequest;
        use crate::dtos::tank_reading::{CreateTankRefillRequest, UpsertTankReadingRequest};
        use crate::handlers::meter_reading::upsert_meter_reading;
        use crate::handlers::shift::{cancel_shift, complete_shift};
        use crate::handlers::tank_reading::upsert_tank_reading;
        use crate::handlers::tank_refill::create_refill;
        use crate::handlers::test_support::{app_state, manager, open_shift, seed_station, Station};
        use crate::state::AppState;

        async fn close_meter(state: &AppState, station: &Station, shift_id: i64, start: f64, end: f64) {
            upsert_meter_reading(
                Path(shift_id),
                State(state.clone()),
                Extension(manager(station)),
                Json(UpsertMeterReadingRequest {
                    dispenser_id: station.dispenser_id,
                    start_reading: Some(start),
                    end_reading: Some(end),
                    test_liters: 0.0,
                    usage_liters: 0.0,
                    discount: 0.0,
                }),
            )
            .await
            .unwrap();
        }

        async fn dip(state: &AppState, station: &Station, shift_id: i64, level: f64) {
            upsert_tank_reading(
                Path(shift_id),
                State(state.clone()),
                Extension(manager(station)),
                Json(UpsertTankReadingRequest { tank_id: station.tank_id, actual_level: Some(level) }),
            )
            .await
            .unwrap();
        }

        async fn complete(state: &AppState, station: &Station, shift_id: i64) {
            complete_shift(Path(shift_id), State(state.clone()), Extension(manager(station)))
                .await
                .unwrap();
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn new_shift_seeds_one_stub_per_active_dispenser_and_tank(pool: PgPool) {
            let station = seed_station(&pool).await;
            let idle_tank: i64 = sqlx::query_scalar(
                "INSERT INTO tanks (code, name, fuel_type_id, capacity, current_level, is_active)
                 VALUES ('T9', 'Retired tank', $1, 1000, 0, FALSE) RETURNING id",
            )
            .bind(station.fuel_type_id)
            .fetch_one(&pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO dispensers (code, name, tank_id, is_active) VALUES ('D9', 'Retired pump', $1, FALSE)")
                .bind(idle_tank)
                .execute(&pool)
                .await
                .unwrap();

            let state = app_state(pool);
            let detail = open_shift(&state, &station, 0).await;

            assert_eq!(detail.meter_readings.len(), 1);
            assert_eq!(detail.meter_readings[0].dispenser_id, station.dispenser_id);
            assert_eq!(detail.meter_readings[0].start_reading, 0.0);
            assert_eq!(detail.meter_readings[0].end_reading, None);

            assert_eq!(detail.tank_readings.len(), 1);
            assert_eq!(detail.tank_readings[0].tank_id, station.tank_id);
            assert_eq!(detail.tank_readings[0].start_level, 5000.0);

            assert_eq!(detail.prices.len(), 1);
            assert_eq!(detail.prices[0].price, 30.0);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn next_shift_starts_from_previous_closing_values(pool: PgPool) {
            let station = seed_station(&pool).await;
            let state = app_state(pool);

            let first = open_shift(&state, &station, 0).await.shift.id;
            close_meter(&state, &station, first, 1000.0, 1500.0).await;
            dip(&state, &station, first, 4480.0).await;
            complete(&state, &station, first).await;

            let second = open_shift(&state, &station, 1).await;
            assert_eq!(second.meter_readings[0].start_reading, 1500.0);
            assert_eq!(second.tank_readings[0].start_level, 4480.0);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn older_dip_does_not_hide_later_refill(pool: PgPool) {
            let station = seed_station(&pool).await;
            let state = app_state(pool.clone());

            let first = open_shift(&state, &station, 0).await.shift.id;
            dip(&state, &station, first, 4000.0).await;
            complete(&state, &station, first).await;

            // No dip in the second shift, only a delivery
            let second = open_shift(&state, &station, 1).await.shift.id;
            create_refill(
                Path(second),
                State(state.clone()),
                Extension(manager(&station)),
                Json(CreateTankRefillRequest { tank_id: station.tank_id, amount: 3000.0, note: None }),
            )
            .await
            .unwrap();
            complete(&state, &station, second).await;

            let current_level: f64 = sqlx::query_scalar("SELECT current_level::FLOAT8 FROM tanks WHERE id = $1")
                .bind(station.tank_id)
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(current_level, 7000.0);

            let third = open_shift(&state, &station, 2).await;
            assert_eq!(third.tank_readings[0].start_level, 7000.0);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn cancelled_shift_is_skipped_when_carrying_over(pool: PgPool) {
            let station = seed_station(&pool).await;
            let state = app_state(pool);

            let first = open_shift(&state, &station, 0).await.shift.id;
            close_meter(&state, &station, first, 0.0, 800.0).await;
            complete(&state, &station, first).await;

            let second = open_shift(&state, &station, 1).await.shift.id;
            close_meter(&state, &station, second, 800.0, 9999.0).await;
            cancel_shift(Path(second), State(state.clone()), Extension(manager(&station)))
                .await
                .unwrap();

            let third = open_shift(&state, &station, 2).await;
            assert_eq!(third.meter_readings[0].start_reading, 800.0);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn snapshot_uses_price_in_effect_at_shift_start(pool: PgPool) {
            let station = seed_station(&pool).await;
            sqlx::query("INSERT INTO fuel_prices (fuel_type_id, price, effective_from) VALUES ($1, 33, NOW())")
                .bind(station.fuel_type_id)
                .execute(&pool)
                .await
                .unwrap();
            let state = app_state(pool);

            // Shift 0 starts days ago, before the 33.00 price took effect
            let backdated = open_shift(&state, &station, 0).await;
            assert_eq!(backdated.prices[0].price, 30.0);
        }
    }
}
