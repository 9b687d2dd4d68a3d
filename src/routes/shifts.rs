use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::{meter_reading, shift, tank_reading, tank_refill};
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/shifts", get(shift::list_shifts).post(shift::create_shift))
        .route("/shifts/{id}", get(shift::get_shift))
        .route("/shifts/{id}/complete", post(shift::complete_shift))
        .route("/shifts/{id}/cancel", post(shift::cancel_shift))
        .route("/shifts/{id}/prices", get(shift::get_shift_prices).put(shift::set_shift_prices))
        // Readings are upserted per dispenser / tank while the shift is active
        .route(
            "/shifts/{id}/meter-readings",
            get(meter_reading::list_meter_readings).put(meter_reading::upsert_meter_reading),
        )
        .route(
            "/shifts/{id}/tank-readings",
            get(tank_reading::list_tank_readings).put(tank_reading::upsert_tank_reading),
        )
        .route(
            "/shifts/{id}/refills",
            get(tank_refill::list_refills).post(tank_refill::create_refill),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
}
