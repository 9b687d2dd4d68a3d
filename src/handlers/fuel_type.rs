use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument};
use validator::Validate;

use crate::dtos::fuel_type::{
    BulkFuelPriceRequest, CreateFuelTypeRequest, FuelPriceResponse, FuelTypeResponse, UpdateFuelTypeRequest,
};
use crate::error::{map_in_use, map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::fuel_type::{FuelPrice, FuelType};
use crate::state::AppState;

const FUEL_TYPE_COLUMNS: &str = "id, code, name, is_active, created_at";

// GET /fuel-types
#[instrument(skip(state))]
pub async fn list_fuel_types(State(state): State<AppState>) -> Result<Json<Vec<FuelTypeResponse>>, AppError> {
    let fuel_types = sqlx::query_as::<_, FuelType>(&format!(
        "SELECT {FUEL_TYPE_COLUMNS} FROM fuel_types ORDER BY code"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(fuel_types.into_iter().map(FuelTypeResponse::from).collect()))
}

// GET /fuel-types/:id
#[instrument(skip(state))]
pub async fn get_fuel_type(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<FuelTypeResponse>, AppError> {
    let fuel_type = sqlx::query_as::<_, FuelType>(&format!(
        "SELECT {FUEL_TYPE_COLUMNS} FROM fuel_types WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Fuel type not found"))?;

    Ok(Json(FuelTypeResponse::from(fuel_type)))
}

// POST /fuel-types
#[instrument(skip(state, auth, payload))]
pub async fn create_fuel_type(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateFuelTypeRequest>,
) -> Result<(StatusCode, Json<FuelTypeResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let fuel_type = sqlx::query_as::<_, FuelType>(&format!(
        "INSERT INTO fuel_types (code, name) VALUES ($1, $2) RETURNING {FUEL_TYPE_COLUMNS}"
    ))
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Fuel type code already exists"))?;

    Ok((StatusCode::CREATED, Json(FuelTypeResponse::from(fuel_type))))
}

// PUT /fuel-types/:id
#[instrument(skip(state, auth, payload))]
pub async fn update_fuel_type(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateFuelTypeRequest>,
) -> Result<Json<FuelTypeResponse>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let fuel_type = sqlx::query_as::<_, FuelType>(&format!(
        "UPDATE fuel_types SET
            name = COALESCE($2, name),
            is_active = COALESCE($3, is_active)
         WHERE id = $1 RETURNING {FUEL_TYPE_COLUMNS}"
    ))
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.is_active)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Fuel type not found"))?;

    Ok(Json(FuelTypeResponse::from(fuel_type)))
}

// DELETE /fuel-types/:id
#[instrument(skip(state, auth))]
pub async fn delete_fuel_type(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    let mut tx = state.db_pool.begin().await?;

    sqlx::query("DELETE FROM fuel_prices WHERE fuel_type_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM fuel_types WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_in_use(e, "Fuel type is used by tanks or shifts"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Fuel type not found"));
    }

    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /fuel-types/:id/prices - price history, newest first
#[instrument(skip(state))]
pub async fn list_fuel_type_prices(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<FuelPriceResponse>>, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fuel_types WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await?;
    if !exists {
        return Err(AppError::not_found("Fuel type not found"));
    }

    let prices = sqlx::query_as::<_, FuelPrice>(
        "SELECT fp.id, fp.fuel_type_id, ft.name AS fuel_type_name,
                fp.price::FLOAT8 AS price, fp.effective_from
         FROM fuel_prices fp
         JOIN fuel_types ft ON ft.id = fp.fuel_type_id
         WHERE fp.fuel_type_id = $1
         ORDER BY fp.effective_from DESC, fp.id DESC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(prices.into_iter().map(FuelPriceResponse::from).collect()))
}

// GET /fuel-prices - current price of every fuel type that has one
#[instrument(skip(state))]
pub async fn list_current_fuel_prices(
    State(state): State<AppState>,
) -> Result<Json<Vec<FuelPriceResponse>>, AppError> {
    let prices = sqlx::query_as::<_, FuelPrice>(
        "SELECT DISTINCT ON (fp.fuel_type_id)
                fp.id, fp.fuel_type_id, ft.name AS fuel_type_name,
                fp.price::FLOAT8 AS price, fp.effective_from
         FROM fuel_prices fp
         JOIN fuel_types ft ON ft.id = fp.fuel_type_id
         WHERE fp.effective_from <= NOW()
         ORDER BY fp.fuel_type_id, fp.effective_from DESC, fp.id DESC",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(prices.into_iter().map(FuelPriceResponse::from).collect()))
}

// PUT /fuel-prices - bulk update, all-or-nothing
#[instrument(skip(state, auth, payload))]
pub async fn bulk_update_fuel_prices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkFuelPriceRequest>,
) -> Result<Json<Vec<FuelPriceResponse>>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let effective_from = payload.effective_from.unwrap_or_else(Utc::now);
    let mut tx = state.db_pool.begin().await?;
    let mut updated = Vec::with_capacity(payload.prices.len());

    for entry in &payload.prices {
        let price = sqlx::query_as::<_, FuelPrice>(
            "WITH inserted AS (
                INSERT INTO fuel_prices (fuel_type_id, price, effective_from, created_by)
                SELECT id, $2::FLOAT8, $3, $4 FROM fuel_types WHERE id = $1
                RETURNING id, fuel_type_id, price, effective_from
             )
             SELECT i.id, i.fuel_type_id, ft.name AS fuel_type_name,
                    i.price::FLOAT8 AS price, i.effective_from
             FROM inserted i JOIN fuel_types ft ON ft.id = i.fuel_type_id",
        )
        .bind(entry.fuel_type_id)
        .bind(entry.price)
        .bind(effective_from)
        .bind(auth.user_id)
        .fetch_optional(&mut *tx)
        .await?
        // Dropping the transaction rolls back every price inserted so far
        .ok_or_else(|| AppError::not_found(format!("Fuel type {} not found", entry.fuel_type_id)))?;

        updated.push(FuelPriceResponse::from(price));
    }

    tx.commit().await?;

    info!(count = updated.len(), by = %auth.username, "Fuel prices updated");
    Ok(Json(updated))
}
