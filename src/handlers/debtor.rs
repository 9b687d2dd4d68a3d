use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::instrument;
use validator::Validate;

use crate::dtos::debtor::{
    CreateDebtorPaymentRequest, CreateDebtorRequest, DebtorPaymentResponse, DebtorResponse, UpdateDebtorRequest,
};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::debtor::{Debtor, DebtorPayment};
use crate::state::AppState;

// Balance is re-aggregated on every read: credit sales minus payments
pub(crate) const DEBTOR_SELECT: &str = "SELECT d.id, d.code, d.name, d.phone,
        d.credit_limit::FLOAT8 AS credit_limit, d.is_active,
        (COALESCE((SELECT SUM(s.total) FROM sales s
                   WHERE s.debtor_id = d.id AND s.payment_type = 'CREDIT'), 0)
         - COALESCE((SELECT SUM(p.amount) FROM debtor_payments p WHERE p.debtor_id = d.id), 0)
        )::FLOAT8 AS balance,
        d.created_at
    FROM debtors d";

pub(crate) async fn fetch_debtor(db_pool: &PgPool, id: i64) -> Result<Debtor, AppError> {
    sqlx::query_as::<_, Debtor>(&format!("{DEBTOR_SELECT} WHERE d.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Debtor not found"))
}

#[instrument(skip(state))]
pub async fn list_debtors(State(state): State<AppState>) -> Result<Json<Vec<DebtorResponse>>, AppError> {
    let debtors = sqlx::query_as::<_, Debtor>(&format!("{DEBTOR_SELECT} ORDER BY d.name"))
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(debtors.into_iter().map(DebtorResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_debtor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DebtorResponse>, AppError> {
    Ok(Json(DebtorResponse::from(fetch_debtor(&state.db_pool, id).await?)))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_debtor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateDebtorRequest>,
) -> Result<(StatusCode, Json<DebtorResponse>), AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO debtors (code, name, phone, credit_limit)
         VALUES ($1, $2, $3, $4::FLOAT8) RETURNING id",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.phone)
    .bind(payload.credit_limit)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Debtor code already exists"))?;

    let debtor = fetch_debtor(&state.db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(DebtorResponse::from(debtor))))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_debtor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateDebtorRequest>,
) -> Result<Json<DebtorResponse>, AppError> {
    auth.require_manager()?;
    payload.validate()?;

    let result = sqlx::query(
        "UPDATE debtors SET
            name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            credit_limit = COALESCE($4::FLOAT8, credit_limit),
            is_active = COALESCE($5, is_active)
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.phone)
    .bind(payload.credit_limit)
    .bind(payload.is_active)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Debtor not found"));
    }

    Ok(Json(DebtorResponse::from(fetch_debtor(&state.db_pool, id).await?)))
}

#[instrument(skip(state))]
pub async fn list_debtor_payments(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DebtorPaymentResponse>>, AppError> {
    fetch_debtor(&state.db_pool, id).await?;

    let payments = sqlx::query_as::<_, DebtorPayment>(
        "SELECT id, debtor_id, amount::FLOAT8 AS amount, note, received_by, created_at
         FROM debtor_payments WHERE debtor_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(payments.into_iter().map(DebtorPaymentResponse::from).collect()))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_debtor_payment(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateDebtorPaymentRequest>,
) -> Result<(StatusCode, Json<DebtorPaymentResponse>), AppError> {
    payload.validate()?;
    fetch_debtor(&state.db_pool, id).await?;

    let payment = sqlx::query_as::<_, DebtorPayment>(
        "INSERT INTO debtor_payments (debtor_id, amount, note, received_by)
         VALUES ($1, $2::FLOAT8, $3, $4)
         RETURNING id, debtor_id, amount::FLOAT8 AS amount, note, received_by, created_at",
    )
    .bind(id)
    .bind(payload.amount)
    .bind(payload.note)
    .bind(auth.user_id)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!(debtor_id = id, amount = payment.amount, by = %auth.username, "Debtor payment recorded");
    Ok((StatusCode::CREATED, Json(DebtorPaymentResponse::from(payment))))
}
