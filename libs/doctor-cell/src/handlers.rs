use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    DayAvailability, DayOfWeek, PutDayScheduleRequest, WeeklySchedule, WeeklyScheduleResponse,
};
use crate::services::ScheduleStore;

#[derive(Clone)]
pub struct DoctorCellState {
    pub schedules: Arc<dyn ScheduleStore>,
}

pub async fn get_weekly_schedule(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<WeeklyScheduleResponse>, AppError> {
    let weekly = state
        .schedules
        .get_weekly_schedule(doctor_id)
        .await?
        .unwrap_or_else(|| WeeklySchedule::empty(doctor_id));

    Ok(Json(WeeklyScheduleResponse::from(&weekly)))
}

pub async fn put_day_schedule(
    State(state): State<DoctorCellState>,
    Path((doctor_id, weekday)): Path<(Uuid, i64)>,
    Json(request): Json<PutDayScheduleRequest>,
) -> Result<Json<WeeklyScheduleResponse>, AppError> {
    let day = DayOfWeek::try_from(weekday)?;
    let availability = match request.schedule {
        Some(schedule) => DayAvailability::Scheduled(schedule.into_schedule()?),
        None => DayAvailability::Unscheduled,
    };

    let weekly = state
        .schedules
        .put_day_schedule(doctor_id, day, availability)
        .await?;

    info!("Updated day {} of weekly schedule for doctor {}", day.number(), doctor_id);
    Ok(Json(WeeklyScheduleResponse::from(&weekly)))
}
