// src/handlers/product.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{error, instrument};
use validator::Validate;

use crate::dtos::product::{
    CreateProductPriceRequest, CreateProductRequest, ProductPriceResponse, ProductResponse, UpdateProductRequest,
};
use crate::error::{map_in_use, map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::product::{Product, ProductPrice};
use crate::state::AppState;

// Current price: latest window containing now
const PRODUCT_SELECT: &str = "SELECT p.id, p.code, p.name, p.unit, p.is_active,
        (SELECT pp.price::FLOAT8 FROM product_prices pp
         WHERE pp.product_id = p.id
           AND pp.effective_from <= NOW()
           AND (pp.effective_to IS NULL OR pp.effective_to > NOW())
         ORDER BY pp.effective_from DESC, pp.id DESC
         LIMIT 1) AS current_price,
        p.created_at
    FROM products p";

async fn fetch_product(db_pool: &PgPool, id: i64) -> Result<Product, AppError> {
    sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))
}

/// Opens a new price window, closing whichever window was open at that instant.
async fn insert_price(
    conn: &mut PgConnection,
    product_id: i64,
    price: f64,
    effective_from: chrono::DateTime<Utc>,
) -> Result<ProductPrice, AppError> {
    sqlx::query(
        "UPDATE product_prices SET effective_to = $2
         WHERE product_id = $1 AND effective_to IS NULL AND effective_from <= $2",
    )
    .bind(product_id)
    .bind(effective_from)
    .execute(&mut *conn)
    .await?;

    let price = sqlx::query_as::<_, ProductPrice>(
        "INSERT INTO product_prices (product_id, price, effective_from)
         VALUES ($1, $2::FLOAT8, $3)
         RETURNING id, product_id, price::FLOAT8 AS price, effective_from, effective_to",
    )
    .bind(product_id)
    .bind(price)
    .bind(effective_from)
    .fetch_one(&mut *conn)
    .await?;

    Ok(price)
}

// GET /products - List all products
#[instrument(skip(state))]
pub async fn get_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, AppError> {
    match sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} ORDER BY p.name"))
        .fetch_all(&state.db_pool)
        .await
    {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/:id - Get single product
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    Ok(Json(ProductResponse::from(fetch_product(&state.db_pool, id).await?)))
}

// POST /products - Create new product
#[instrument(skip(state, auth, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (code, name, unit) VALUES ($1, $2, COALESCE($3, 'unit')) RETURNING id",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.unit.as_deref().map(str::trim))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "Product code already exists"))?;

    if let Some(price) = payload.price {
        insert_price(&mut tx, id, price, Utc::now()).await?;
    }

    tx.commit().await?;

    let product = fetch_product(&state.db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/:id - Update product
#[instrument(skip(state, auth, payload))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let result = sqlx::query(
        "UPDATE products SET
            name = COALESCE($2, name),
            unit = COALESCE($3, unit),
            is_active = COALESCE($4, is_active)
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.unit.as_deref().map(str::trim))
    .bind(payload.is_active)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    Ok(Json(ProductResponse::from(fetch_product(&state.db_pool, id).await?)))
}

// DELETE /products/:id - Delete product
#[instrument(skip(state, auth))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| map_in_use(e, "Product appears on sales; deactivate it instead"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// GET /products/:id/prices - price windows, newest first
#[instrument(skip(state))]
pub async fn list_product_prices(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductPriceResponse>>, AppError> {
    fetch_product(&state.db_pool, id).await?;

    let prices = sqlx::query_as::<_, ProductPrice>(
        "SELECT id, product_id, price::FLOAT8 AS price, effective_from, effective_to
         FROM product_prices WHERE product_id = $1
         ORDER BY effective_from DESC, id DESC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(prices.into_iter().map(ProductPriceResponse::from).collect()))
}

// POST /products/:id/prices - open a new price window
#[instrument(skip(state, auth, payload))]
pub async fn create_product_price(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductPriceRequest>,
) -> Result<(StatusCode, Json<ProductPriceResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;
    fetch_product(&state.db_pool, id).await?;

    let mut tx = state.db_pool.begin().await?;
    let price = insert_price(&mut tx, id, payload.price, payload.effective_from.unwrap_or_else(Utc::now)).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(ProductPriceResponse::from(price))))
}
