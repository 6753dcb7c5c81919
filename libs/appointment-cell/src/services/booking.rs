use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::models::SlotGrid;
use doctor_cell::services::{ScheduleStore, SlotGenerator};
use shared_config::AppConfig;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest};
use crate::services::conflict::{filter_available, ConflictDetectionService};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::subscription::AppointmentSubscription;
use crate::store::{AppointmentStore, InsertOutcome, StatusUpdate};

/// Turns schedules into free slots and commits bookings so that no two active
/// appointments of one doctor overlap, however many requests race.
pub struct BookingCoordinator {
    appointments: Arc<dyn AppointmentStore>,
    slot_generator: SlotGenerator,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    max_appointment_minutes: i64,
}

impl BookingCoordinator {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
        config: &AppConfig,
    ) -> Self {
        let max_appointment_minutes = config.max_appointment_minutes;

        Self {
            slot_generator: SlotGenerator::new(schedules),
            conflict_service: ConflictDetectionService::new(
                Arc::clone(&appointments),
                max_appointment_minutes,
            ),
            lifecycle_service: AppointmentLifecycleService::new(),
            appointments,
            max_appointment_minutes,
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    /// Free slots for the doctor at `clinic_id` on `date`, ascending.
    #[instrument(skip(self))]
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        date: NaiveDate,
    ) -> Result<SlotGrid, AppointmentError> {
        let grid = self.slot_generator.slot_grid(doctor_id, clinic_id, date).await?;
        if grid.is_empty() {
            return Ok(grid);
        }

        let existing = self
            .conflict_service
            .appointments_for_day(doctor_id, date)
            .await?;
        let starts = filter_available(&grid.starts, grid.slot_duration_minutes, &existing);

        debug!(
            "{} of {} slots free for doctor {} on {}",
            starts.len(),
            grid.starts.len(),
            doctor_id,
            date
        );

        Ok(SlotGrid { starts, ..grid })
    }

    /// Commit a new `pending` appointment, or fail with `SlotUnavailable`.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, start_time = %request.start_time))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<Uuid, AppointmentError> {
        self.validate_duration(request.duration_minutes)?;
        self.conflict_service
            .prefilter_window(request.start_time, request.duration_minutes)?;

        let doctor_id = request.doctor_id;
        let start_time = request.start_time;

        // Cheap early rejection; the store repeats the check atomically.
        if !self
            .conflict_service
            .is_available(doctor_id, start_time, request.duration_minutes)
            .await?
        {
            return Err(AppointmentError::SlotUnavailable { doctor_id, start_time });
        }

        let appointment = request.into_pending(Uuid::new_v4(), Utc::now());

        match self.appointments.insert_if_available(appointment).await? {
            InsertOutcome::Inserted(id) => {
                info!("Booked appointment {} for doctor {} at {}", id, doctor_id, start_time);
                Ok(id)
            }
            InsertOutcome::Conflict => {
                warn!("Lost booking race for doctor {} at {}", doctor_id, start_time);
                Err(AppointmentError::SlotUnavailable { doctor_id, start_time })
            }
        }
    }

    /// Cancel a pending or confirmed appointment. Cancelling a cancelled
    /// appointment is a no-op; a completed one stays completed.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled, false).await
    }

    pub async fn confirm(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(appointment_id, AppointmentStatus::Confirmed).await
    }

    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(appointment_id, AppointmentStatus::Completed).await
    }

    /// Move an appointment along the status state machine.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, new_status, true).await
    }

    #[instrument(skip(self))]
    async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        enforce_lifecycle: bool,
    ) -> Result<Appointment, AppointmentError> {
        // Each stale read means the status moved forward; the state machine has
        // no cycles, so this settles within a few rounds.
        loop {
            let current = self.appointments.get(appointment_id).await?;

            if current.status == AppointmentStatus::Cancelled
                && new_status == AppointmentStatus::Cancelled
            {
                debug!("Appointment {} already cancelled", appointment_id);
                return Ok(current);
            }

            if enforce_lifecycle {
                self.lifecycle_service
                    .validate_status_transition(current.status, new_status)?;
            } else if current.status == AppointmentStatus::Completed {
                warn!("Refusing to move completed appointment {} to {}", appointment_id, new_status);
                return Err(AppointmentError::InvalidStatusTransition {
                    from: current.status,
                    to: new_status,
                });
            }

            match self
                .appointments
                .update_status(appointment_id, current.status, new_status)
                .await?
            {
                StatusUpdate::Updated(updated) => {
                    info!(
                        "Appointment {} moved from {} to {}",
                        appointment_id, current.status, new_status
                    );
                    return Ok(updated);
                }
                StatusUpdate::Stale(actual) => {
                    debug!(
                        "Appointment {} changed to {} concurrently, re-reading",
                        appointment_id, actual
                    );
                }
            }
        }
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        Ok(self.appointments.get(appointment_id).await?)
    }

    pub async fn patient_appointments(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_by_patient(patient_id).await?)
    }

    pub async fn subscribe_patient_appointments(
        &self,
        patient_id: Uuid,
    ) -> Result<AppointmentSubscription, AppointmentError> {
        Ok(self.appointments.query_by_patient(patient_id).await?)
    }

    pub async fn is_available(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<bool, AppointmentError> {
        self.validate_duration(duration_minutes)?;
        self.conflict_service
            .prefilter_window(start_time, duration_minutes)?;
        self.conflict_service
            .is_available(doctor_id, start_time, duration_minutes)
            .await
    }

    fn validate_duration(&self, minutes: i64) -> Result<(), AppointmentError> {
        if minutes <= 0 || minutes > self.max_appointment_minutes {
            return Err(AppointmentError::InvalidDuration {
                minutes,
                max: self.max_appointment_minutes,
            });
        }
        Ok(())
    }
}
