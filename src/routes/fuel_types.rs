use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::fuel_type;
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/fuel-types", get(fuel_type::list_fuel_types).post(fuel_type::create_fuel_type))
        .route(
            "/fuel-types/{id}",
            get(fuel_type::get_fuel_type)
                .put(fuel_type::update_fuel_type)
                .delete(fuel_type::delete_fuel_type),
        )
        .route("/fuel-types/{id}/prices", get(fuel_type::list_fuel_type_prices))
        .route(
            "/fuel-prices",
            get(fuel_type::list_current_fuel_prices).put(fuel_type::bulk_update_fuel_prices),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
}
