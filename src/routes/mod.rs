pub mod users;
pub mod fuel_types;
pub mod tanks;
pub mod products;
pub mod debtors;
pub mod shifts;
pub mod sales;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(users::routes(state))
        .merge(fuel_types::routes(state))
        .merge(tanks::routes(state))
        .merge(products::routes(state))
        .merge(debtors::routes(state))
        .merge(shifts::routes(state))
        .merge(sales::routes(state))
}

/// Full application: API under `/api`, plus an open health check.
pub fn build_app(state: AppState) -> Router {
    let api = create_router(&state)
        .route("/", get(|| async { "Fuel Station API" }));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::auth::jwt::sign_token;
    use crate::config::Config;
    use crate::models::user::Role;

    const SECRET: &str = "router-test-secret";

    // Requests in these tests are rejected before any query runs, so the pool never connects.
    fn app() -> Router {
        let config = Config::from_lookup(|key: &str| match key {
            "DATABASE_URL" => Some("postgres://localhost/fuelstation_test".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
        build_app(AppState::new(pool, config))
    }

    fn bearer(role: Role) -> String {
        let token = sign_token(7, role, "tester", SECRET, 1).unwrap();
        format!("Bearer {token}")
    }

    fn json_request(method: Method, uri: &str, auth: Option<String>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let response = app()
            .oneshot(Request::builder().uri("/api/shifts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/sales")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn plain_user_cannot_manage_fuel_types() {
        let request = json_request(
            Method::POST,
            "/api/fuel-types",
            Some(bearer(Role::User)),
            serde_json::json!({ "code": "DSL", "name": "Diesel" }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sale_without_items_is_rejected_with_field_issue() {
        let request = json_request(
            Method::POST,
            "/api/sales",
            Some(bearer(Role::User)),
            serde_json::json!({
                "bill_number": "B-001",
                "shift_id": 1,
                "payment_type": "CASH",
                "items": []
            }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        let issues = body["issues"].as_array().unwrap();
        assert!(issues.iter().any(|i| i["field"] == "items"));
    }

    #[tokio::test]
    async fn credit_sale_without_debtor_is_rejected() {
        let request = json_request(
            Method::POST,
            "/api/sales",
            Some(bearer(Role::Manager)),
            serde_json::json!({
                "bill_number": "B-002",
                "shift_id": 1,
                "payment_type": "CREDIT",
                "items": [{ "product_id": 1, "quantity": 2.0 }]
            }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_requires_username() {
        let request = json_request(
            Method::POST,
            "/api/users/login",
            None,
            serde_json::json!({ "username": "", "password": "secret" }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
