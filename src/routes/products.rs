use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::product::{
    get_products, get_product, create_product, update_product, delete_product,
    list_product_prices, create_product_price,
};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route("/products/{id}", get(get_product).put(update_product).delete(delete_product))
        .route("/products/{id}/prices", get(list_product_prices).post(create_product_price))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
}
