use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::conflict::blocks;
use crate::services::subscription::{AppointmentSubscription, SnapshotTrigger};

use super::{AppointmentStore, InsertOutcome, StatusUpdate};

const CHANGE_FEED_CAPACITY: usize = 256;

struct Inner {
    appointments: DashMap<Uuid, Appointment>,
    /// Serialises check-and-insert per doctor. Never pruned: grows with the doctors
    /// this process has seen.
    doctor_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    /// Patient ids whose appointment set just changed.
    changes: broadcast::Sender<Uuid>,
}

impl Inner {
    fn list_by_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|entry| entry.patient_id == patient_id)
            .map(|entry| entry.value().clone())
            .collect();
        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        appointments
    }

    fn notify(&self, patient_id: Uuid) {
        // No receivers is fine.
        let _ = self.changes.send(patient_id);
    }
}

/// Process-local appointment store. Serves tests and single-instance deployments.
#[derive(Clone)]
pub struct InMemoryAppointmentStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                appointments: DashMap::new(),
                doctor_locks: DashMap::new(),
                changes,
            }),
        }
    }

    fn doctor_lock(&self, doctor_id: Uuid) -> Arc<Mutex<()>> {
        self.inner
            .doctor_locks
            .entry(doctor_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn query_by_doctor_and_range(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut appointments: Vec<Appointment> = self
            .inner
            .appointments
            .iter()
            .filter(|entry| {
                entry.doctor_id == doctor_id && entry.start_time >= from && entry.start_time <= to
            })
            .map(|entry| entry.value().clone())
            .collect();
        appointments.sort_by_key(|apt| apt.start_time);
        Ok(appointments)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.inner.list_by_patient(patient_id))
    }

    async fn query_by_patient(&self, patient_id: Uuid) -> Result<AppointmentSubscription, StoreError> {
        let changes = self.inner.changes.subscribe();
        let inner = Arc::clone(&self.inner);

        Ok(AppointmentSubscription::spawn(
            move || {
                let snapshot = inner.list_by_patient(patient_id);
                async move { Ok(snapshot) }
            },
            SnapshotTrigger::Changes { patient_id, changes },
        ))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        self.inner
            .appointments
            .get(&appointment_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(appointment_id))
    }

    async fn insert_if_available(&self, appointment: Appointment) -> Result<InsertOutcome, StoreError> {
        let lock = self.doctor_lock(appointment.doctor_id);
        let _guard = lock.lock().await;

        let conflict = self.inner.appointments.iter().any(|entry| {
            entry.doctor_id == appointment.doctor_id
                && blocks(entry.value(), appointment.start_time, appointment.duration_minutes)
        });
        if conflict {
            debug!(
                "Rejected insert for doctor {} at {}: interval taken",
                appointment.doctor_id, appointment.start_time
            );
            return Ok(InsertOutcome::Conflict);
        }

        let id = appointment.id;
        let patient_id = appointment.patient_id;
        self.inner.appointments.insert(id, appointment);
        self.inner.notify(patient_id);

        Ok(InsertOutcome::Inserted(id))
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<StatusUpdate, StoreError> {
        let updated = {
            let mut entry = self
                .inner
                .appointments
                .get_mut(&appointment_id)
                .ok_or(StoreError::NotFound(appointment_id))?;

            if entry.status != expected {
                return Ok(StatusUpdate::Stale(entry.status));
            }
            entry.status = new_status;
            entry.value().clone()
        };

        self.inner.notify(updated.patient_id);
        Ok(StatusUpdate::Updated(updated))
    }
}
