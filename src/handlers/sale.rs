use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::dtos::sale::{CreateSaleRequest, ListSalesQuery, SaleListItem, SaleResponse};
use crate::error::{is_unique_violation, AppError};
use crate::handlers::debtor::DEBTOR_SELECT;
use crate::handlers::shift::{lock_open_shift, recompute_shift_totals};
use crate::middleware::auth::AuthContext;
use crate::models::debtor::Debtor;
use crate::models::sale::{PaymentType, Sale, SaleItem};
use crate::reconciliation::sale::{self as sale_math, PricedLine};
use crate::state::AppState;

const SALE_COLUMNS: &str = "id, bill_number, shift_id, payment_type, debtor_id,
    subtotal::FLOAT8 AS subtotal, discount::FLOAT8 AS discount, total::FLOAT8 AS total,
    note, created_by, created_at";

#[derive(sqlx::FromRow)]
struct PricedProduct {
    name: String,
    is_active: bool,
    current_price: Option<f64>,
}

pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    req.validate()?;

    let bill_number = req.bill_number.trim();

    // Start transaction
    let mut tx = state.db_pool.begin().await?;

    lock_open_shift(&mut tx, req.shift_id).await?;

    let duplicate: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE bill_number = $1)")
        .bind(bill_number)
        .fetch_one(&mut *tx)
        .await?;
    if duplicate {
        return Err(AppError::field("bill_number", "Bill number already exists"));
    }

    // Row lock keeps two concurrent credit sales from both passing the limit check
    let debtor = match req.debtor_id {
        Some(debtor_id) => {
            let debtor = sqlx::query_as::<_, Debtor>(&format!("{DEBTOR_SELECT} WHERE d.id = $1 FOR UPDATE OF d"))
                .bind(debtor_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found("Debtor not found"))?;
            if !debtor.is_active {
                return Err(AppError::field("debtor_id", "Debtor is inactive"));
            }
            Some(debtor)
        }
        None => None,
    };

    // Price every line against the product's current price window
    let mut lines = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = sqlx::query_as::<_, PricedProduct>(
            "SELECT p.name, p.is_active,
                    (SELECT pp.price::FLOAT8 FROM product_prices pp
                     WHERE pp.product_id = p.id
                       AND pp.effective_from <= NOW()
                       AND (pp.effective_to IS NULL OR pp.effective_to > NOW())
                     ORDER BY pp.effective_from DESC, pp.id DESC
                     LIMIT 1) AS current_price
             FROM products p WHERE p.id = $1",
        )
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;

        if !product.is_active {
            return Err(AppError::validation(format!("Product '{}' is not active", product.name)));
        }

        let current_price = product
            .current_price
            .ok_or_else(|| AppError::validation(format!("Product '{}' has no current price", product.name)))?;

        lines.push(PricedLine {
            quantity: item.quantity,
            unit_price: sale_math::round_money(item.unit_price.unwrap_or(current_price)),
            discount: sale_math::round_money(item.discount),
        });
    }

    let totals = sale_math::totals(&lines, req.discount);

    if let (PaymentType::Credit, Some(debtor)) = (req.payment_type, &debtor) {
        if sale_math::exceeds_credit_limit(debtor.balance, totals.total, debtor.credit_limit) {
            return Err(AppError::field(
                "debtor_id",
                format!(
                    "Credit limit of {:.2} exceeded (balance {:.2}, sale {:.2})",
                    debtor.credit_limit.unwrap_or_default(),
                    debtor.balance,
                    totals.total
                ),
            ));
        }
    }

    let sale_id: i64 = sqlx::query_scalar(
        "INSERT INTO sales (bill_number, shift_id, payment_type, debtor_id, subtotal, discount, total, note, created_by)
         VALUES ($1, $2, $3, $4, $5::FLOAT8, $6::FLOAT8, $7::FLOAT8, $8, $9)
         RETURNING id",
    )
    .bind(bill_number)
    .bind(req.shift_id)
    .bind(req.payment_type)
    .bind(req.debtor_id)
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(totals.total)
    .bind(&req.note)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // Lost a race with a concurrent sale using the same bill number
        if is_unique_violation(&e) {
            return AppError::field("bill_number", "Bill number already exists");
        }
        AppError::db(e)
    })?;

    for (item, line) in req.items.iter().zip(&lines) {
        sqlx::query(
            "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, discount, total)
             VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8)",
        )
        .bind(sale_id)
        .bind(item.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount)
        .bind(line.total())
        .execute(&mut *tx)
        .await?;
    }

    let shift_totals = recompute_shift_totals(&mut tx, req.shift_id).await?;

    // Commit transaction
    tx.commit().await?;

    info!(
        sale_id,
        %bill_number,
        shift_id = req.shift_id,
        total = totals.total,
        shift_total = shift_totals.total_sales,
        by = %auth.username,
        "Sale recorded"
    );

    Ok((StatusCode::CREATED, Json(fetch_sale_by_id(&state.db_pool, sale_id).await?)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SaleResponse>, AppError> {
    fetch_sale_by_id(&state.db_pool, id).await.map(Json)
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<ListSalesQuery>,
) -> Result<Json<Vec<SaleListItem>>, AppError> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales
         WHERE ($1::BIGINT IS NULL OR shift_id = $1)
           AND ($2::BIGINT IS NULL OR debtor_id = $2)
           AND ($3::payment_type IS NULL OR payment_type = $3)
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(params.shift_id)
    .bind(params.debtor_id)
    .bind(params.payment_type)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(sales.into_iter().map(SaleListItem::from).collect()))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager()?;

    let mut tx = state.db_pool.begin().await?;

    let (shift_id, payment_type): (i64, PaymentType) =
        sqlx::query_as("SELECT shift_id, payment_type FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Sale not found"))?;

    lock_open_shift(&mut tx, shift_id).await?;

    sqlx::query("DELETE FROM sales WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    recompute_shift_totals(&mut tx, shift_id).await?;

    tx.commit().await?;

    info!(sale_id = id, shift_id, ?payment_type, by = %auth.username, "Sale deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Helper function to fetch full sale details
async fn fetch_sale_by_id(db_pool: &PgPool, id: i64) -> Result<SaleResponse, AppError> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Sale not found"))?;

    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT si.id, si.sale_id, si.product_id, p.name AS product_name,
                si.quantity::FLOAT8 AS quantity, si.unit_price::FLOAT8 AS unit_price,
                si.discount::FLOAT8 AS discount, si.total::FLOAT8 AS total
         FROM sale_items si
         JOIN products p ON p.id = si.product_id
         WHERE si.sale_id = $1
         ORDER BY si.id",
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?;

    Ok(SaleResponse::new(sale, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dtos::sale::SaleItemRequest;
    use crate::handlers::shift::fetch_shift;
    use crate::handlers::test_support::{app_state, manager, open_shift, seed_station, Station};

    fn item(station: &Station, quantity: f64, unit_price: Option<f64>, discount: f64) -> SaleItemRequest {
        SaleItemRequest { product_id: station.product_id, quantity, unit_price, discount }
    }

    fn sale(bill: &str, shift_id: i64, payment_type: PaymentType, debtor_id: Option<i64>, items: Vec<SaleItemRequest>) -> CreateSaleRequest {
        CreateSaleRequest {
            bill_number: bill.to_string(),
            shift_id,
            payment_type,
            debtor_id,
            discount: 0.0,
            note: None,
            items,
        }
    }

    async fn post(state: &AppState, station: &Station, req: CreateSaleRequest) -> Result<SaleResponse, AppError> {
        create_sale(State(state.clone()), Extension(manager(station)), Json(req))
            .await
            .map(|(_, Json(created))| created)
    }

    async fn add_debtor(pool: &PgPool, credit_limit: Option<f64>) -> i64 {
        sqlx::query_scalar("INSERT INTO debtors (code, name, credit_limit) VALUES ('C1', 'Fleet customer', $1::FLOAT8) RETURNING id")
            .bind(credit_limit)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn assert_shift_totals_match_sales(pool: &PgPool, shift_id: i64) {
        let shift = fetch_shift(pool, shift_id).await.unwrap();
        let recorded: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(total), 0)::FLOAT8 FROM sales WHERE shift_id = $1")
            .bind(shift_id)
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(shift.total_sales, shift.cash_sales + shift.credit_sales);
        assert_eq!(shift.total_sales, recorded);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_bill_number_is_rejected_and_first_sale_kept(pool: PgPool) {
        let station = seed_station(&pool).await;
        let state = app_state(pool.clone());
        let shift_id = open_shift(&state, &station, 0).await.shift.id;

        let mut first = sale(
            "B-001",
            shift_id,
            PaymentType::Cash,
            None,
            vec![item(&station, 10.0, Some(35.0), 0.0), item(&station, 1.0, None, 50.0)],
        );
        first.discount = 20.0;
        let created = post(&state, &station, first).await.unwrap();
        assert_eq!(created.subtotal, 650.0);
        assert_eq!(created.total, 630.0);

        let again = sale("B-001", shift_id, PaymentType::Cash, None, vec![item(&station, 1.0, None, 0.0)]);
        let err = post(&state, &station, again).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let kept = fetch_sale_by_id(&pool, created.id).await.unwrap();
        assert_eq!(kept.total, 630.0);
        assert_eq!(kept.items.len(), 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 1);
        assert_shift_totals_match_sales(&pool, shift_id).await;
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn shift_totals_follow_creates_and_deletes(pool: PgPool) {
        let station = seed_station(&pool).await;
        let debtor_id = add_debtor(&pool, None).await;
        let state = app_state(pool.clone());
        let shift_id = open_shift(&state, &station, 0).await.shift.id;

        let cash = post(&state, &station, sale("B-010", shift_id, PaymentType::Cash, None, vec![item(&station, 1.0, None, 0.0)]))
            .await
            .unwrap();
        post(&state, &station, sale("B-011", shift_id, PaymentType::Credit, Some(debtor_id), vec![item(&station, 2.0, None, 0.0)]))
            .await
            .unwrap();

        let shift = fetch_shift(&pool, shift_id).await.unwrap();
        assert_eq!(shift.cash_sales, 350.0);
        assert_eq!(shift.credit_sales, 700.0);
        assert_shift_totals_match_sales(&pool, shift_id).await;

        let status = delete_sale(State(state.clone()), Extension(manager(&station)), Path(cash.id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let shift = fetch_shift(&pool, shift_id).await.unwrap();
        assert_eq!(shift.cash_sales, 0.0);
        assert_eq!(shift.total_sales, 700.0);
        assert_shift_totals_match_sales(&pool, shift_id).await;
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn stored_sale_total_equals_sum_of_stored_items(pool: PgPool) {
        let station = seed_station(&pool).await;
        let state = app_state(pool.clone());
        let shift_id = open_shift(&state, &station, 0).await.shift.id;

        let created = post(
            &state,
            &station,
            sale(
                "B-020",
                shift_id,
                PaymentType::Cash,
                None,
                vec![item(&station, 0.125, Some(1.0), 0.0), item(&station, 0.125, Some(1.0), 0.0)],
            ),
        )
        .await
        .unwrap();

        let (sale_total, item_sum): (f64, f64) = sqlx::query_as(
            "SELECT s.total::FLOAT8, (SELECT SUM(si.total) FROM sale_items si WHERE si.sale_id = s.id)::FLOAT8
             FROM sales s WHERE s.id = $1",
        )
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(sale_total, item_sum);
        assert_eq!(sale_total, 0.26);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn credit_sale_over_limit_is_rejected(pool: PgPool) {
        let station = seed_station(&pool).await;
        let debtor_id = add_debtor(&pool, Some(500.0)).await;
        let state = app_state(pool.clone());
        let shift_id = open_shift(&state, &station, 0).await.shift.id;

        post(&state, &station, sale("B-030", shift_id, PaymentType::Credit, Some(debtor_id), vec![item(&station, 1.0, None, 0.0)]))
            .await
            .unwrap();

        let err = post(&state, &station, sale("B-031", shift_id, PaymentType::Credit, Some(debtor_id), vec![item(&station, 1.0, None, 0.0)]))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let shift = fetch_shift(&pool, shift_id).await.unwrap();
        assert_eq!(shift.credit_sales, 350.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn sale_on_completed_shift_is_rejected(pool: PgPool) {
        let station = seed_station(&pool).await;
        let state = app_state(pool);
        let shift_id = open_shift(&state, &station, 0).await.shift.id;
        crate::handlers::shift::complete_shift(Path(shift_id), State(state.clone()), Extension(manager(&station)))
            .await
            .unwrap();

        let err = post(&state, &station, sale("B-040", shift_id, PaymentType::Cash, None, vec![item(&station, 1.0, None, 0.0)]))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
