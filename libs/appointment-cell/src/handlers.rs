use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Duration;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentStatus, AvailableSlot, AvailableSlotsQuery, AvailableSlotsResponse,
    BookAppointmentRequest, BookingResponse, UpdateStatusRequest,
};
use crate::services::BookingCoordinator;

pub type BookingState = Arc<BookingCoordinator>;

pub async fn get_available_slots(
    State(coordinator): State<BookingState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let grid = coordinator
        .available_slots(doctor_id, query.clinic_id, query.date)
        .await?;

    let slot_length = Duration::minutes(grid.slot_duration_minutes);
    let slots = grid
        .starts
        .iter()
        .map(|start| AvailableSlot {
            start_time: *start,
            end_time: *start + slot_length,
        })
        .collect();

    Ok(Json(AvailableSlotsResponse {
        doctor_id,
        clinic_id: query.clinic_id,
        date: query.date,
        slot_duration_minutes: grid.slot_duration_minutes,
        slots,
    }))
}

pub async fn book_appointment(
    State(coordinator): State<BookingState>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let id = coordinator.book(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            id,
            status: AppointmentStatus::Pending,
        }),
    ))
}

pub async fn get_appointment(
    State(coordinator): State<BookingState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(coordinator.get_appointment(appointment_id).await?))
}

pub async fn update_appointment_status(
    State(coordinator): State<BookingState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(
        coordinator
            .update_status(appointment_id, request.status)
            .await?,
    ))
}

pub async fn cancel_appointment(
    State(coordinator): State<BookingState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(coordinator.cancel(appointment_id).await?))
}

pub async fn get_patient_appointments(
    State(coordinator): State<BookingState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    Ok(Json(coordinator.patient_appointments(patient_id).await?))
}
