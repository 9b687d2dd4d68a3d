use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::{dispenser, tank};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/tanks", get(tank::list_tanks).post(tank::create_tank))
        .route(
            "/tanks/{id}",
            get(tank::get_tank).put(tank::update_tank).delete(tank::delete_tank),
        )
        .route("/dispensers", get(dispenser::list_dispensers).post(dispenser::create_dispenser))
        .route(
            "/dispensers/{id}",
            get(dispenser::get_dispenser)
                .put(dispenser::update_dispenser)
                .delete(dispenser::delete_dispenser),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
}
