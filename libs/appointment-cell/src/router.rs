use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::BookingCoordinator;

pub fn appointment_routes(coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/doctors/{doctor_id}/available-slots", get(handlers::get_available_slots))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .with_state(coordinator)
}
