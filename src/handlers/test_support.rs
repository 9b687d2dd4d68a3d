//! Fixtures for handler tests that run against a freshly migrated database
//! (`#[sqlx::test]`).

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::config::Config;
use crate::dtos::shift::{CreateShiftRequest, ShiftDetailResponse};
use crate::handlers::shift::create_shift;
use crate::middleware::auth::AuthContext;
use crate::models::user::Role;
use crate::state::AppState;

/// One fuel type at 30.00/L, one 20 000 L tank holding 5 000 L, one pump on
/// that tank, and one shop product at 350.00.
pub(crate) struct Station {
    pub user_id: i64,
    pub fuel_type_id: i64,
    pub tank_id: i64,
    pub dispenser_id: i64,
    pub product_id: i64,
}

pub(crate) fn app_state(pool: PgPool) -> AppState {
    let config = Config::from_lookup(|key: &str| match key {
        "DATABASE_URL" => Some("postgres://localhost/fuelstation_test".to_string()),
        "JWT_SECRET" => Some("handler-test-secret".to_string()),
        _ => None,
    })
    .unwrap();
    AppState::new(pool, config)
}

pub(crate) fn manager(station: &Station) -> AuthContext {
    AuthContext { user_id: station.user_id, role: Role::Manager, username: "manager".into() }
}

/// Shift start times spaced 8 hours apart, all safely in the past.
pub(crate) fn shift_start(index: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(5) + Duration::hours(8 * index)
}

pub(crate) async fn seed_station(pool: &PgPool) -> Station {
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, role) VALUES ('manager', 'x', 'MANAGER') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let fuel_type_id: i64 =
        sqlx::query_scalar("INSERT INTO fuel_types (code, name) VALUES ('DSL', 'Diesel') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();

    sqlx::query(
        "INSERT INTO fuel_prices (fuel_type_id, price, effective_from) VALUES ($1, 30, NOW() - INTERVAL '30 days')",
    )
    .bind(fuel_type_id)
    .execute(pool)
    .await
    .unwrap();

    let tank_id: i64 = sqlx::query_scalar(
        "INSERT INTO tanks (code, name, fuel_type_id, capacity, current_level)
         VALUES ('T1', 'Diesel tank', $1, 20000, 5000) RETURNING id",
    )
    .bind(fuel_type_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let dispenser_id: i64 =
        sqlx::query_scalar("INSERT INTO dispensers (code, name, tank_id) VALUES ('D1', 'Pump 1', $1) RETURNING id")
            .bind(tank_id)
            .fetch_one(pool)
            .await
            .unwrap();

    let product_id: i64 =
        sqlx::query_scalar("INSERT INTO products (code, name) VALUES ('OIL', 'Engine oil') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();

    sqlx::query(
        "INSERT INTO product_prices (product_id, price, effective_from) VALUES ($1, 350, NOW() - INTERVAL '30 days')",
    )
    .bind(product_id)
    .execute(pool)
    .await
    .unwrap();

    Station { user_id, fuel_type_id, tank_id, dispenser_id, product_id }
}

pub(crate) async fn open_shift(state: &AppState, station: &Station, index: i64) -> ShiftDetailResponse {
    let (_, Json(detail)) = create_shift(
        State(state.clone()),
        Extension(manager(station)),
        Json(CreateShiftRequest { name: format!("Shift {index}"), start_time: Some(shift_start(index)) }),
    )
    .await
    .unwrap();
    detail
}
