mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::subscription::AppointmentSubscription;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Uuid),
    /// An active appointment for the same doctor overlaps the new one.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated(Appointment),
    /// The stored status was no longer the expected one.
    Stale(AppointmentStatus),
}

/// Persistence port for appointments.
///
/// `insert_if_available` is the only way an appointment is created and must be
/// atomic: the overlap check and the insert cannot be separated by another
/// insert for the same doctor.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments of `doctor_id` whose start lies in `[from, to]`, ascending.
    async fn query_by_doctor_and_range(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// All appointments of a patient, newest start first.
    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    /// Snapshots of `list_by_patient` as it changes.
    async fn query_by_patient(&self, patient_id: Uuid) -> Result<AppointmentSubscription, StoreError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError>;

    async fn insert_if_available(&self, appointment: Appointment) -> Result<InsertOutcome, StoreError>;

    /// Set the status only if it is still `expected`.
    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<StatusUpdate, StoreError>;
}
