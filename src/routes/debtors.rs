use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::debtor;
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/debtors", get(debtor::list_debtors).post(debtor::create_debtor))
        .route("/debtors/{id}", get(debtor::get_debtor).put(debtor::update_debtor))
        .route(
            "/debtors/{id}/payments",
            get(debtor::list_debtor_payments).post(debtor::create_debtor_payment),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
}
