use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::{self, DoctorCellState};
use crate::services::ScheduleStore;

pub fn doctor_routes(schedules: Arc<dyn ScheduleStore>) -> Router {
    Router::new()
        .route("/{doctor_id}/schedule", get(handlers::get_weekly_schedule))
        .route("/{doctor_id}/schedule/{weekday}", put(handlers::put_day_schedule))
        .with_state(DoctorCellState { schedules })
}
