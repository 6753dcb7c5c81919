use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("No weekly schedule for doctor {0}")]
    ScheduleNotFound(Uuid),

    #[error("Doctor is scheduled at clinic {scheduled}, not {requested}")]
    ClinicMismatch { scheduled: Uuid, requested: Uuid },

    #[error("Doctor is not available on this day")]
    DayUnavailable,

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Day of week must be between 1 (Monday) and 7 (Sunday), got {0}")]
    InvalidWeekday(i64),

    #[error("Schedule store error: {0}")]
    Persistence(String),
}

impl ScheduleError {
    /// Outcomes that mean "no availability" rather than a failure.
    pub fn is_no_availability(&self) -> bool {
        matches!(
            self,
            ScheduleError::ScheduleNotFound(_)
                | ScheduleError::ClinicMismatch { .. }
                | ScheduleError::DayUnavailable
        )
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::ScheduleNotFound(_) => AppError::NotFound(err.to_string()),
            ScheduleError::ClinicMismatch { .. } | ScheduleError::DayUnavailable => {
                AppError::BadRequest(err.to_string())
            }
            ScheduleError::InvalidDuration(_)
            | ScheduleError::InvalidTimeRange
            | ScheduleError::InvalidWeekday(_) => AppError::ValidationError(err.to_string()),
            ScheduleError::Persistence(msg) => AppError::Database(msg),
        }
    }
}
