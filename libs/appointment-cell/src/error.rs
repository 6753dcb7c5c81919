use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::ScheduleError;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

/// Failures reported by an appointment store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Appointment store error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Doctor {doctor_id} is already booked at {start_time}")]
    SlotUnavailable {
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
    },

    #[error("Invalid duration: {minutes} minutes (allowed 1..={max})")]
    InvalidDuration { minutes: i64, max: i64 },

    #[error("Time out of supported range: {0}")]
    TimeOutOfRange(String),

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppointmentError::NotFound(id),
            StoreError::Backend(msg) => AppointmentError::Persistence(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::SlotUnavailable { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidDuration { .. } | AppointmentError::TimeOutOfRange(_) => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Persistence(msg) => AppError::Database(msg),
            AppointmentError::Schedule(inner) => inner.into(),
        }
    }
}
